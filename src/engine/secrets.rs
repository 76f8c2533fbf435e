use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::{ConfigField, ReconcileError, Result};

/// Plain and secret parameters folded into one map, plus the names of the
/// secret ones so they can be kept out of anything derived later.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedConfiguration {
    pub values: Map<String, Value>,
    pub secret_keys: BTreeSet<String>,
}

fn parse_object(field: ConfigField, raw: &str) -> Result<Map<String, Value>> {
    serde_json::from_str(raw).map_err(|source| ReconcileError::MalformedConfig {
        field,
        raw: raw.to_string(),
        source,
    })
}

/// Parses the secret blob. Unset and `""` both mean "no secrets".
pub fn parse_secrets(secret_config_json: Option<&str>) -> Result<Map<String, Value>> {
    match secret_config_json {
        None | Some("") => Ok(Map::new()),
        Some(raw) => parse_object(ConfigField::SecretConfig, raw),
    }
}

pub fn secret_keys(secret_config_json: Option<&str>) -> Result<BTreeSet<String>> {
    Ok(parse_secrets(secret_config_json)?.into_iter().map(|(k, _)| k).collect())
}

/// Merges the two blobs, refusing any key present in both.
pub fn separate(config_json: Option<&str>, secret_config_json: Option<&str>) -> Result<MergedConfiguration> {
    let mut values = match config_json {
        None => Map::new(),
        Some(raw) => parse_object(ConfigField::Config, raw)?,
    };
    let secrets = parse_secrets(secret_config_json)?;

    let mut secret_keys = BTreeSet::new();
    for (key, value) in secrets {
        if values.contains_key(&key) {
            return Err(ReconcileError::KeyCollision { key });
        }
        secret_keys.insert(key.clone());
        values.insert(key, value);
    }

    Ok(MergedConfiguration { values, secret_keys })
}
