use crate::client::{AccountScope, Scope, XsoarApi};
use crate::error::Result;

/// Global endpoints unless an account is declared.
pub fn route(account: Option<&str>) -> Scope {
    match account.filter(|a| !a.is_empty()) {
        Some(account) => Scope::Account(AccountScope::for_account(account)),
        None => Scope::Global,
    }
}

/// Whether the owning account still exists. Global scope always does.
pub async fn account_exists(api: &dyn XsoarApi, scope: &Scope) -> Result<bool> {
    match scope {
        Scope::Global => Ok(true),
        Scope::Account(account) => {
            let found = api.get_account(account).await?.is_some();
            if !found {
                tracing::warn!(account = account.as_str(), "owning account is gone");
            }
            Ok(found)
        }
    }
}
