use anyhow::{Context, Result, anyhow};
use console::style;
use std::fs;
use std::sync::Arc;
use soar_sync::{
    Diagnostic, HttpXsoarClient, InstanceLoader, InstanceReconciler, IntegrationInstance, Operation,
    ReadOutcome, ReconcileError, XsoarApi,
};
use crate::cli::commands::{Args, Commands};
use crate::cli::config::Config;
use crate::cli::state::{read_state, remove_state, write_state};

fn connect(config: &Config, operation: Operation) -> Result<Arc<dyn XsoarApi>> {
    let client = HttpXsoarClient::new(config.client_settings())
        .map_err(|e| report(operation, e))?;
    Ok(Arc::new(client))
}

/// What `apply` will do first, given the recorded state.
fn apply_operation(current: Option<&IntegrationInstance>) -> Operation {
    match current {
        None => Operation::Create,
        Some(_) => Operation::Update,
    }
}

/// Prints the diagnostic and turns it into the command's error.
fn report(operation: Operation, err: ReconcileError) -> anyhow::Error {
    let diagnostic = Diagnostic::from_error(operation, &err);
    eprintln!("{} {}", style(format!("{}:", diagnostic.summary)).red().bold(), diagnostic.detail);
    anyhow!(diagnostic.to_string())
}

pub async fn handle_command(args: Args) -> Result<()> {
    let config = Config::load()?.overlay(&args);

    match args.command {
        Commands::Configure { timeout_secs } => {
            let mut config = config;
            if timeout_secs.is_some() {
                config.timeout_secs = timeout_secs;
            }
            config.save()?;
            println!("Settings saved to {:?}", Config::get_path()?);
        }
        Commands::Apply { plan, state } => {
            let content = fs::read_to_string(&plan)
                .with_context(|| format!("Failed to read plan file {:?}", plan))?;
            let planned = InstanceLoader::new().load(&content)?;
            let current = read_state(&state)?;
            let reconciler = InstanceReconciler::new(connect(&config, apply_operation(current.as_ref()))?);

            let applied = match current {
                None => create(&reconciler, &planned).await?,
                Some(current) if current.requires_replacement(&planned) => {
                    println!("Module or account changed, replacing {}", current.name);
                    reconciler
                        .delete(&current)
                        .await
                        .map_err(|e| report(Operation::Delete, e))?;
                    remove_state(&state)?;
                    create(&reconciler, &planned).await?
                }
                Some(current) => reconciler
                    .update(&planned, &current)
                    .await
                    .map_err(|e| report(Operation::Update, e))?,
            };

            write_state(&state, &applied)?;
            println!(
                "{} {} (ID: {})",
                style("Applied").green(),
                applied.name,
                applied.id.as_deref().unwrap_or("")
            );
        }
        Commands::Refresh { state } => {
            let current = read_state(&state)?
                .ok_or_else(|| anyhow!("No state recorded at {:?}", state))?;
            let reconciler = InstanceReconciler::new(connect(&config, Operation::Read)?);
            match reconciler
                .read(&current)
                .await
                .map_err(|e| report(Operation::Read, e))?
            {
                ReadOutcome::Present(refreshed) => {
                    write_state(&state, &refreshed)?;
                    println!("Refreshed {}", refreshed.name);
                }
                ReadOutcome::Absent => {
                    remove_state(&state)?;
                    println!("{} {} no longer exists, state removed", style("Gone:").yellow(), current.name);
                }
            }
        }
        Commands::Destroy { state } => {
            let current = read_state(&state)?
                .ok_or_else(|| anyhow!("No state recorded at {:?}", state))?;
            let reconciler = InstanceReconciler::new(connect(&config, Operation::Delete)?);
            reconciler
                .delete(&current)
                .await
                .map_err(|e| report(Operation::Delete, e))?;
            remove_state(&state)?;
            println!("Destroyed {}", current.name);
        }
        Commands::Import { identifier, state } => {
            if read_state(&state)?.is_some() {
                return Err(anyhow!("State file {:?} already manages an instance", state));
            }
            let reconciler = InstanceReconciler::new(connect(&config, Operation::Import)?);
            let imported = reconciler
                .import(&identifier)
                .await
                .map_err(|e| report(Operation::Import, e))?;
            write_state(&state, &imported)?;
            println!(
                "Imported {} (ID: {})",
                imported.name,
                imported.id.as_deref().unwrap_or("")
            );
        }
        Commands::Modules { filter } => {
            let api = connect(&config, Operation::Read)?;
            let catalog = api
                .list_modules()
                .await
                .map_err(|e| report(Operation::Read, e))?;
            for module in &catalog.modules {
                if filter.as_deref().is_some_and(|f| !module.name.contains(f)) {
                    continue;
                }
                println!("- {} [{}] ({} parameters)", module.name, module.category, module.parameters.len());
            }
        }
    }

    Ok(())
}

async fn create(reconciler: &InstanceReconciler, planned: &IntegrationInstance) -> Result<IntegrationInstance> {
    reconciler
        .create(planned)
        .await
        .map_err(|e| report(Operation::Create, e))
}
