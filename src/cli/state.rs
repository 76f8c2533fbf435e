use anyhow::{Context, Result};
use soar_sync::IntegrationInstance;
use std::fs;
use std::path::Path;

/// Reads a state file. A missing or blank file means nothing is managed yet.
pub fn read_state(path: &Path) -> Result<Option<IntegrationInstance>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file {:?}", path))?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let state = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state file {:?}", path))?;
    Ok(Some(state))
}

pub fn write_state(path: &Path, state: &IntegrationInstance) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(state)?;
    fs::write(path, content).with_context(|| format!("Failed to write state file {:?}", path))?;
    Ok(())
}

pub fn remove_state(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove state file {:?}", path))?;
    }
    Ok(())
}
