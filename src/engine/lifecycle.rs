use std::collections::BTreeSet;

use super::assembler::{assemble_request, AssemblyMode};
use super::reconciler::to_instance;
use super::resolver::fetch_module;
use super::router::{account_exists, route};
use super::secrets::{secret_keys, separate};
use super::{InstanceReconciler, ReadOutcome};
use crate::client::Scope;
use crate::error::{ReconcileError, Result};
use crate::instance::IntegrationInstance;
use crate::schema::ModuleInstanceRequest;

/// An import identifier split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub account: Option<String>,
    pub name: String,
}

/// `teamA.myslack` is scoped to `teamA`; `myslack` is global.
///
/// Only the first dot separates the account, so `teamA.my.slack` names
/// `my.slack`. An empty account segment means global.
pub fn parse_import_id(identifier: &str) -> ImportTarget {
    match identifier.split_once('.') {
        Some((account, name)) => ImportTarget {
            account: Some(account.to_string()).filter(|a| !a.is_empty()),
            name: name.to_string(),
        },
        None => ImportTarget {
            account: None,
            name: identifier.to_string(),
        },
    }
}

fn require_id(state: &IntegrationInstance) -> Result<&str> {
    state
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ReconcileError::Precondition(format!("integration instance '{}' has no id", state.name)))
}

impl InstanceReconciler {
    /// Absent -> Present.
    pub async fn create(&self, plan: &IntegrationInstance) -> Result<IntegrationInstance> {
        if plan.id.is_some() {
            return Err(ReconcileError::Precondition(format!(
                "integration instance '{}' already has an id; update it instead",
                plan.name
            )));
        }
        let merged = separate(plan.config_json.as_deref(), plan.secret_config_json.as_deref())?;
        let scope = route(plan.account_name());
        let module = fetch_module(self.api.as_ref(), &plan.integration_name).await?;

        // A previous create may have landed remotely without its state being
        // recorded; adopt that instance instead of creating a twin.
        let adopted = match self.api.get_instance_by_name(&scope, &plan.name).await? {
            Some(existing) if existing.name != plan.name => None,
            Some(existing) if existing.brand == module.name => {
                tracing::info!(name = %plan.name, id = %existing.id, "adopting existing integration instance");
                Some(existing.id)
            }
            Some(existing) => {
                return Err(ReconcileError::Precondition(format!(
                    "an integration instance named '{}' already exists for module '{}'",
                    plan.name, existing.brand
                )));
            }
            None => None,
        };

        let assembly = assemble_request(&module, plan, &merged.values, AssemblyMode::Create, adopted.as_deref());
        warn_unmatched(&plan.name, &assembly.unmatched);

        let instance = self
            .write(&scope, &assembly.request, plan.account.clone(), plan, &merged.secret_keys)
            .await?;
        tracing::info!(name = %instance.name, id = ?instance.id, "created integration instance");
        Ok(instance)
    }

    /// Present -> Present, or Present -> Absent when the instance or its
    /// account has disappeared.
    pub async fn read(&self, state: &IntegrationInstance) -> Result<ReadOutcome> {
        let id = require_id(state)?;
        let keys = secret_keys(state.secret_config_json.as_deref())?;
        let scope = route(state.account_name());

        if !account_exists(self.api.as_ref(), &scope).await? {
            return Ok(ReadOutcome::Absent);
        }

        let Some(remote) = self.api.get_instance_by_id(&scope, id).await? else {
            tracing::warn!(name = %state.name, id, "integration instance is gone, removing from state");
            return Ok(ReadOutcome::Absent);
        };

        let instance = to_instance(
            &remote,
            state.account.clone(),
            state.secret_config_json.clone().unwrap_or_default(),
            &keys,
        )?;
        Ok(ReadOutcome::Present(instance))
    }

    /// Present -> Present, reusing the existing id.
    ///
    /// The module and account are fixed once created; a plan that changes
    /// either must go through delete and create instead.
    pub async fn update(
        &self,
        plan: &IntegrationInstance,
        state: &IntegrationInstance,
    ) -> Result<IntegrationInstance> {
        let id = require_id(state)?;
        if state.requires_replacement(plan) {
            return Err(ReconcileError::Precondition(format!(
                "integration instance '{}' cannot change its module or account in place; replace it",
                state.name
            )));
        }
        let merged = separate(plan.config_json.as_deref(), plan.secret_config_json.as_deref())?;
        let scope = route(state.account_name());
        let module = fetch_module(self.api.as_ref(), &state.integration_name).await?;

        let assembly = assemble_request(&module, plan, &merged.values, AssemblyMode::Update, Some(id));
        warn_unmatched(&plan.name, &assembly.unmatched);

        let instance = self
            .write(&scope, &assembly.request, state.account.clone(), plan, &merged.secret_keys)
            .await?;
        tracing::info!(name = %instance.name, id, "updated integration instance");
        Ok(instance)
    }

    /// Present -> Absent. Local state is dropped by the caller once this returns `Ok`.
    pub async fn delete(&self, state: &IntegrationInstance) -> Result<()> {
        let id = require_id(state)?;
        let scope = route(state.account_name());
        self.api.delete_instance(&scope, id).await?;
        tracing::info!(name = %state.name, id, "deleted integration instance");
        Ok(())
    }

    /// External -> Present. Secrets cannot be read back, so they start empty.
    pub async fn import(&self, identifier: &str) -> Result<IntegrationInstance> {
        let target = parse_import_id(identifier);
        let scope = route(target.account.as_deref());

        let remote = self
            .api
            .get_instance_by_name(&scope, &target.name)
            .await?
            .ok_or_else(|| ReconcileError::ImportNotFound { name: target.name.clone() })?;

        let instance = to_instance(&remote, target.account, "{}".to_string(), &BTreeSet::new())?;
        tracing::info!(name = %instance.name, id = ?instance.id, "imported integration instance");
        Ok(instance)
    }

    async fn write(
        &self,
        scope: &Scope,
        request: &ModuleInstanceRequest,
        account: Option<String>,
        plan: &IntegrationInstance,
        keys: &BTreeSet<String>,
    ) -> Result<IntegrationInstance> {
        tracing::debug!(
            name = %request.name,
            brand = %request.brand,
            parameters = request.data.len(),
            scope = ?scope,
            "writing integration instance"
        );
        let remote = self.api.upsert_instance(scope, request).await?;
        to_instance(
            &remote,
            account,
            plan.secret_config_json.clone().unwrap_or_default(),
            keys,
        )
    }
}

fn warn_unmatched(name: &str, unmatched: &[String]) {
    for key in unmatched {
        tracing::warn!(instance = name, key = %key, "configuration key matches no module parameter, dropping it");
    }
}
