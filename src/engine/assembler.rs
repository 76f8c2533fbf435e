use serde_json::{Map, Value};

use crate::instance::IntegrationInstance;
use crate::schema::{
    AssembledParameter, ModuleDefinition, ModuleInstanceRequest, ModuleParameter, UNASSIGNED_VERSION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    /// Unset parameters are left for the server to default.
    Create,
    /// Unset parameters are sent with their schema default, if they have one.
    Update,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub request: ModuleInstanceRequest,
    /// Configuration keys that matched no schema parameter and were dropped.
    pub unmatched: Vec<String>,
}

/// Projects `config` onto the schema, in schema order.
pub fn assemble_parameters(
    schema: &[ModuleParameter],
    config: &Map<String, Value>,
    mode: AssemblyMode,
) -> Vec<AssembledParameter> {
    schema
        .iter()
        .map(|parameter| {
            let found = config
                .get(&parameter.display)
                .or_else(|| config.get(&parameter.name));
            let value = match (found, mode) {
                (Some(value), _) => Some(value.clone()),
                (None, AssemblyMode::Update) => parameter.default_value.clone(),
                (None, AssemblyMode::Create) => None,
            };
            let mut parameter = parameter.clone();
            parameter.metadata.remove("hasvalue");
            AssembledParameter {
                parameter,
                value,
                has_value: found.is_some(),
            }
        })
        .collect()
}

/// Keys of `config` that no schema parameter answers to, by name or display label.
pub fn unmatched_keys(schema: &[ModuleParameter], config: &Map<String, Value>) -> Vec<String> {
    config
        .keys()
        .filter(|key| !schema.iter().any(|p| &p.display == *key || &p.name == *key))
        .cloned()
        .collect()
}

/// Builds the full write payload for `plan` against `module`.
///
/// `id` is `None` for a fresh create and the existing remote id otherwise.
pub fn assemble_request(
    module: &ModuleDefinition,
    plan: &IntegrationInstance,
    config: &Map<String, Value>,
    mode: AssemblyMode,
    id: Option<&str>,
) -> Assembly {
    let data = assemble_parameters(&module.parameters, config, mode);
    let unmatched = unmatched_keys(&module.parameters, config);

    let request = ModuleInstanceRequest {
        id: id.map(str::to_string),
        brand: module.name.clone(),
        can_sample: module.can_get_samples,
        category: module.category.clone(),
        configuration: module.raw.clone(),
        data,
        default_ignore: false,
        enabled: plan.enabled.unwrap_or(true).to_string(),
        engine: plan.engine_id.clone().unwrap_or_default(),
        incoming_mapper_id: plan.incoming_mapper_id.clone().unwrap_or_default(),
        mapping_id: plan.mapping_id.clone().unwrap_or_default(),
        is_integration_script: module.is_integration_script,
        name: plan.name.clone(),
        propagation_labels: plan.propagation_labels.iter().cloned().collect(),
        version: UNASSIGNED_VERSION,
    };

    Assembly { request, unmatched }
}
