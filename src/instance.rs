use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Accepts either JSON text or an inline object, storing the text form.
fn json_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => serde_json::to_string(&other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// The managed entity: a module bound to runtime parameters, optionally
/// scoped to an account.
///
/// `integration_name` and `account` are fixed at creation; a change to either
/// means the host destroys and recreates the instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub integration_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub propagation_labels: BTreeSet<String>,
    #[serde(default, deserialize_with = "json_text")]
    pub config_json: Option<String>,
    #[serde(default, deserialize_with = "json_text")]
    pub secret_config_json: Option<String>,
    #[serde(default)]
    pub incoming_mapper_id: Option<String>,
    #[serde(default)]
    pub mapping_id: Option<String>,
    #[serde(default)]
    pub engine_id: Option<String>,
}

impl IntegrationInstance {
    pub fn new(name: impl Into<String>, integration_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            integration_name: integration_name.into(),
            ..Default::default()
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_config(mut self, config_json: impl Into<String>) -> Self {
        self.config_json = Some(config_json.into());
        self
    }

    pub fn with_secrets(mut self, secret_config_json: impl Into<String>) -> Self {
        self.secret_config_json = Some(secret_config_json.into());
        self
    }

    /// The account, with an empty string treated as global.
    pub fn account_name(&self) -> Option<&str> {
        self.account.as_deref().filter(|a| !a.is_empty())
    }

    /// Whether moving from `self` to `planned` forces destroy + recreate.
    pub fn requires_replacement(&self, planned: &IntegrationInstance) -> bool {
        self.integration_name != planned.integration_name
            || self.account_name() != planned.account_name()
    }
}

pub struct InstanceLoader;

impl Default for InstanceLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn load(&self, content: &str) -> Result<IntegrationInstance> {
        // YAML is a superset of JSON, so one parser covers both plan formats
        let instance: IntegrationInstance = serde_yaml::from_str(content)?;
        Ok(instance)
    }
}
