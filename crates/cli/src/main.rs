//! Skywatch CLI - Main Entry Point
//!
//! Diagnostic commands that exercise a running deployment's event streams:
//! verify commits on the origin server or relay, inspect a single sequence
//! number, and census raw binary frames. Exit code 0 means verified, 1
//! means timeout or unmet expectation, so orchestration tooling can gate
//! deployment pipelines on these commands.

use clap::{Parser, Subcommand};
use skywatch_client::config::{DEFAULT_DOMAIN, DEFAULT_PARTITION};
use skywatch_client::Deployment;

mod commands;

use commands::{inspect, probe, verify};

/// Skywatch - event-stream diagnostics for a decentralized social deployment
#[derive(Parser)]
#[command(name = "skywatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Deployment base domain
    #[arg(long, env = "DOMAIN", default_value = DEFAULT_DOMAIN, global = true)]
    domain: String,

    /// Deployment partition
    #[arg(long, env = "PARTITION", default_value = DEFAULT_PARTITION, global = true)]
    partition: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify that commit events flow from an endpoint
    Verify(verify::VerifyArgs),

    /// Inspect the commit with a given sequence number
    Inspect(inspect::InspectArgs),

    /// Census raw binary frame types from an endpoint
    ProbeRaw(probe::ProbeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let deployment = Deployment::new(cli.domain.as_str(), cli.partition.as_str());

    let verified = match cli.command {
        Commands::Verify(args) => verify::execute(args, &deployment).await?,
        Commands::Inspect(args) => inspect::execute(args, &deployment).await?,
        Commands::ProbeRaw(args) => probe::execute(args).await?,
    };

    if !verified {
        std::process::exit(1);
    }
    Ok(())
}
