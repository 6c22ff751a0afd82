//! Zone sync CLI
//!
//! Inspects and drives a running zone sync daemon through its admin API.

mod client;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Zone sync CLI
#[derive(Parser)]
#[command(name = "zonectl")]
#[command(author, version, about = "CLI for the zone sync daemon", long_about = None)]
pub struct Cli {
    /// Admin API URL of the daemon (can also be set via ZONECTL_API_URL env var)
    #[arg(long, env = "ZONECTL_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show scheduler state and the last sync result
    Status,

    /// Run a sync cycle now and wait for its result
    Sync,

    /// Show component health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url, cli.timeout)?;

    match cli.command {
        Commands::Status => {
            let status = client.status().await?;
            output::print_status(&status, cli.format)?;
        }
        Commands::Sync => {
            let result = client.trigger_sync().await?;
            output::print_sync_result(&result, cli.format)?;
            if !result.success {
                std::process::exit(1);
            }
        }
        Commands::Health => {
            let health = client.health().await?;
            output::print_health(&health, cli.format)?;
        }
    }

    Ok(())
}
