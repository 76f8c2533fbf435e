//! Wire shapes exchanged with the platform API.
//!
//! Everything the server sends is decoded here once, into typed records. The
//! engine never pokes at untyped maps; fields the API is sloppy about (null vs.
//! absent vs. wrong type) are absorbed by the lenient helpers below.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Sent as `version` on every write so the server assigns the real one.
pub const UNASSIGNED_VERSION: i64 = -1;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `Some` only when the field is a JSON string.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// One configurable field of a module. `name` and `display` are aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleParameter {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display: String,
    #[serde(rename = "defaultValue", default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Everything else the catalog says about the parameter, echoed back verbatim.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl ModuleParameter {
    pub fn new(name: impl Into<String>, display: impl Into<String>, default_value: Value) -> Self {
        Self {
            name: name.into(),
            display: display.into(),
            default_value: Some(default_value),
            metadata: Map::new(),
        }
    }

    pub fn without_default(mut self) -> Self {
        self.default_value = None;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Deserialize)]
struct ModuleEntry {
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    category: String,
    #[serde(rename = "canGetSamples", default, deserialize_with = "null_as_default")]
    can_get_samples: bool,
    #[serde(rename = "integrationScript", default)]
    integration_script: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    configuration: Vec<ModuleParameter>,
}

/// A catalog entry: a connector type and its parameter schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDefinition {
    pub name: String,
    pub category: String,
    pub can_get_samples: bool,
    pub is_integration_script: bool,
    pub parameters: Vec<ModuleParameter>,
    /// The catalog entry as received; sent back as `configuration` on writes.
    pub raw: Value,
}

impl ModuleDefinition {
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let entry: ModuleEntry = serde_json::from_value(raw.clone())?;
        Ok(Self {
            name: entry.name,
            category: entry.category,
            can_get_samples: entry.can_get_samples,
            is_integration_script: matches!(entry.integration_script, Some(ref v) if !v.is_null()),
            parameters: entry.configuration,
            raw,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleCatalog {
    pub modules: Vec<ModuleDefinition>,
}

impl ModuleCatalog {
    pub fn new(modules: Vec<ModuleDefinition>) -> Self {
        Self { modules }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }
}

/// Body of `POST /settings/integration/search`. Entries stay raw until picked.
#[derive(Debug, Default, Deserialize)]
pub struct IntegrationSearch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub configurations: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instances: Vec<Value>,
}

/// A schema parameter with its resolved value, as placed in the write payload's `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledParameter {
    pub parameter: ModuleParameter,
    pub value: Option<Value>,
    pub has_value: bool,
}

impl Serialize for AssembledParameter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut object = match serde_json::to_value(&self.parameter).map_err(<S::Error as serde::ser::Error>::custom)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Some(value) = &self.value {
            object.insert("value".to_string(), value.clone());
        }
        object.insert("hasvalue".to_string(), Value::Bool(self.has_value));
        object.serialize(serializer)
    }
}

/// The module instance payload for `PUT /settings/integration`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInstanceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub brand: String,
    pub can_sample: bool,
    pub category: String,
    pub configuration: Value,
    pub data: Vec<AssembledParameter>,
    pub default_ignore: bool,
    /// Stringified boolean, the API rejects a JSON bool here.
    pub enabled: String,
    pub engine: String,
    pub incoming_mapper_id: String,
    pub mapping_id: String,
    pub is_integration_script: bool,
    pub name: String,
    pub propagation_labels: Vec<String>,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteParameter {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// An instance as the server reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteInstance {
    pub id: String,
    pub name: String,
    pub brand: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub enabled: Option<String>,
    #[serde(rename = "propagationLabels", default, deserialize_with = "lenient_string_list")]
    pub propagation_labels: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<RemoteParameter>,
    #[serde(rename = "incomingMapperId", default, deserialize_with = "lenient_string")]
    pub incoming_mapper_id: Option<String>,
    #[serde(rename = "mappingId", default, deserialize_with = "lenient_string")]
    pub mapping_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub engine: Option<String>,
}

impl RemoteInstance {
    /// True when the undecoded entry carries `expected` as its string `field`.
    pub fn raw_field_is(raw: &Value, field: &str, expected: &str) -> bool {
        raw.get(field).and_then(Value::as_str) == Some(expected)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteAccount {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}
