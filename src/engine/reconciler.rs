use std::collections::BTreeSet;

use serde_json::Map;

use crate::error::{ReconcileError, Result};
use crate::instance::IntegrationInstance;
use crate::schema::RemoteInstance;

/// Accepts the same spellings as the platform's own boolean parser.
pub fn parse_remote_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// The non-secret configuration snapshot of `remote`, as JSON text.
///
/// Parameters without a string name are skipped. Anything named in
/// `secret_keys` is left out even if the server echoed its value.
pub fn config_snapshot(remote: &RemoteInstance, secret_keys: &BTreeSet<String>) -> Result<String> {
    let snapshot: Map<_, _> = remote
        .data
        .iter()
        .filter_map(|p| p.name.as_ref().map(|name| (name, &p.value)))
        .filter(|(name, _)| !secret_keys.contains(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    serde_json::to_string(&snapshot)
        .map_err(|source| ReconcileError::Decode { what: "configuration snapshot", source })
}

/// Rebuilds the declared entity from a remote instance.
///
/// `account` and `secret_config_json` never come from the server: the caller
/// passes what it already knows.
pub fn to_instance(
    remote: &RemoteInstance,
    account: Option<String>,
    secret_config_json: String,
    secret_keys: &BTreeSet<String>,
) -> Result<IntegrationInstance> {
    Ok(IntegrationInstance {
        id: Some(remote.id.clone()),
        name: remote.name.clone(),
        integration_name: remote.brand.clone(),
        account,
        enabled: remote.enabled.as_deref().and_then(parse_remote_bool),
        propagation_labels: remote.propagation_labels.iter().cloned().collect(),
        config_json: Some(config_snapshot(remote, secret_keys)?),
        secret_config_json: Some(secret_config_json),
        incoming_mapper_id: remote.incoming_mapper_id.clone(),
        mapping_id: remote.mapping_id.clone(),
        engine_id: remote.engine.clone(),
    })
}
