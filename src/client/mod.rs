use async_trait::async_trait;

use crate::error::Result;
use crate::schema::{ModuleCatalog, ModuleInstanceRequest, RemoteAccount, RemoteInstance};

pub mod http;
pub use http::{ClientSettings, HttpXsoarClient};

/// Tenant identifiers are namespaced with this before they reach the API.
pub const ACCOUNT_PREFIX: &str = "acc_";

/// A tenant name in its API form, e.g. `acc_teamA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountScope(String);

impl AccountScope {
    pub fn for_account(account: &str) -> Self {
        Self(format!("{}{}", ACCOUNT_PREFIX, account))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Which family of endpoints an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Global,
    Account(AccountScope),
}

impl Scope {
    pub fn path_prefix(&self) -> String {
        match self {
            Scope::Global => String::new(),
            Scope::Account(account) => format!("/{}", account.as_str()),
        }
    }
}

/// The platform operations the engine relies on.
///
/// Lookups return `Ok(None)` when the server reports the object missing;
/// every other failure is an error.
#[async_trait]
pub trait XsoarApi: Send + Sync {
    async fn list_modules(&self) -> Result<ModuleCatalog>;

    async fn get_instance_by_id(&self, scope: &Scope, id: &str) -> Result<Option<RemoteInstance>>;

    async fn get_instance_by_name(&self, scope: &Scope, name: &str) -> Result<Option<RemoteInstance>>;

    async fn get_account(&self, account: &AccountScope) -> Result<Option<RemoteAccount>>;

    async fn upsert_instance(&self, scope: &Scope, payload: &ModuleInstanceRequest) -> Result<RemoteInstance>;

    async fn delete_instance(&self, scope: &Scope, id: &str) -> Result<()>;
}
