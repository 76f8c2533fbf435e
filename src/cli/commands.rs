use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Keep integration instances in sync with a SOAR platform", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Platform base URL (e.g., https://soar.example.com)
    #[arg(long, global = true, env = "DEMISTO_BASE_URL")]
    pub base_url: Option<String>,

    /// API key sent in the Authorization header
    #[arg(long, global = true, env = "DEMISTO_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// API key id, required by cloud tenants
    #[arg(long, global = true, env = "DEMISTO_AUTH_ID")]
    pub auth_id: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save connection settings to the local config file
    Configure {
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Create or update an instance from a plan file
    Apply {
        /// Path to the plan file (YAML/JSON)
        #[arg(short, long)]
        plan: PathBuf,
        /// Path to the state file
        #[arg(short, long, default_value = "instance.state.json")]
        state: PathBuf,
    },
    /// Refresh the state file from the platform
    Refresh {
        #[arg(short, long, default_value = "instance.state.json")]
        state: PathBuf,
    },
    /// Delete the instance recorded in the state file
    Destroy {
        #[arg(short, long, default_value = "instance.state.json")]
        state: PathBuf,
    },
    /// Import an existing instance as `account.name` or `name`
    Import {
        identifier: String,
        #[arg(short, long, default_value = "instance.state.json")]
        state: PathBuf,
    },
    /// List modules available on the platform
    Modules {
        /// Only show modules whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
}
