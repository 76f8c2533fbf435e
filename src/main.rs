mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::commands::Args;
use crate::cli::handlers::handle_command;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    handle_command(args).await
}
