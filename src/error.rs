use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Which declared blob failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Config,
    SecretConfig,
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigField::Config => f.write_str("config_json"),
            ConfigField::SecretConfig => f.write_str("secret_config_json"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("could not parse integration instance {field}: {source}\n\"{raw}\"")]
    MalformedConfig {
        field: ConfigField,
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("key '{key}' exists in 'secret_config_json' and 'config_json'. Please choose 1.")]
    KeyCollision { key: String },

    #[error("no integration module named '{name}' in the catalog")]
    ModuleNotFound { name: String },

    #[error("{operation} failed with status {status}: {body}")]
    RemoteCallFailed {
        operation: &'static str,
        status: u16,
        headers: BTreeMap<String, String>,
        body: String,
        payload: Option<String>,
    },

    #[error("{operation} failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("client is not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    Precondition(String),

    #[error("could not find integration instance: {name}")]
    ImportNotFound { name: String },
}

impl ReconcileError {
    pub fn not_configured(reason: impl Into<String>) -> Self {
        ReconcileError::NotConfigured(reason.into())
    }
}

/// Lifecycle step an error is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl Operation {
    fn summary(self) -> &'static str {
        match self {
            Operation::Create => "Error creating integration instance",
            Operation::Read => "Error getting integration instance",
            Operation::Update => "Error updating integration instance",
            Operation::Delete => "Error deleting integration instance",
            Operation::Import => "Error importing integration instance",
        }
    }
}

/// A host-facing error entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub operation: Operation,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn from_error(operation: Operation, err: &ReconcileError) -> Self {
        let summary = match err {
            ReconcileError::ImportNotFound { .. } => "Integration instance not found",
            ReconcileError::NotConfigured(_) => "Provider not configured",
            _ => operation.summary(),
        };
        Self {
            operation,
            summary: summary.to_string(),
            detail: err.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
