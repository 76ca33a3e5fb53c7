//! Quorum CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Initialize config, data directory, and a sample registry
//! - `serve`   — Start the gateway and orchestration engine
//! - `scores`  — Show agent performance rankings
//! - `session` — Show a session's contribution ledger and payout split
//! - `doctor`  — Diagnose configuration and stores

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "quorum",
    about = "Quorum — multi-agent query orchestration and payout engine",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration, data directory, and a sample registry
    Onboard,

    /// Start the gateway and orchestration engine
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show agent performance rankings
    Scores {
        /// Show at most this many agents
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a session's contribution ledger and payout split
    Session {
        /// Session id
        id: String,

        /// Total amount to split; uses the configured default when absent
        #[arg(short, long)]
        total: Option<f64>,
    },

    /// Diagnose configuration and stores
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Scores { limit } => commands::scores::run(limit).await?,
        Commands::Session { id, total } => commands::session::run(&id, total).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
