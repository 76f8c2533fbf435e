use crate::client::XsoarApi;
use crate::error::{ReconcileError, Result};
use crate::schema::{ModuleCatalog, ModuleDefinition};

/// Picks the catalog entry whose name matches exactly.
pub fn resolve_module<'a>(catalog: &'a ModuleCatalog, name: &str) -> Result<&'a ModuleDefinition> {
    catalog
        .modules
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| ReconcileError::ModuleNotFound { name: name.to_string() })
}

/// Fetches the catalog and resolves `name` in it. Nothing is cached between calls.
pub async fn fetch_module(api: &dyn XsoarApi, name: &str) -> Result<ModuleDefinition> {
    let catalog = api.list_modules().await?;
    tracing::debug!(modules = catalog.modules.len(), module = name, "fetched module catalog");
    resolve_module(&catalog, name).cloned()
}
