//! Lapse - in-memory session store with idle eviction
//!
//! Main entry point for the Lapse CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

mod commands;
mod config;

use commands::{demo, load};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Lapse - in-memory session store with idle eviction
#[derive(Parser)]
#[command(name = "lapse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a TOML config file
    #[arg(long, global = true, env = "LAPSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Evict sessions not updated for this many milliseconds
    #[arg(long, global = true, env = "LAPSE_IDLE_TIMEOUT_MS")]
    pub idle_timeout_ms: Option<u64>,

    /// Milliseconds between sweeper passes
    #[arg(long, global = true, env = "LAPSE_SWEEP_INTERVAL_MS")]
    pub sweep_interval_ms: Option<u64>,

    /// Also write JSON logs to a daily-rotated file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a session, store a value in it and read it back
    Demo(demo::DemoArgs),

    /// Drive many concurrent sessions and check the eviction window
    Load(load::LoadArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console logs go to stderr so --json output stays clean on stdout.
    let filter = if cli.verbose {
        "lapse=debug,lapse_session=debug,info"
    } else {
        "lapse=info,lapse_session=info,warn"
    };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| filter.to_string());

    let (file_layer, _guard) = match &cli.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "lapse.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "lapse=trace,lapse_session=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    let file_config = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::FileConfig::default(),
    };
    let store = config::resolve_store_config(
        &file_config,
        &config::StoreOverrides {
            idle_timeout_ms: cli.idle_timeout_ms,
            sweep_interval_ms: cli.sweep_interval_ms,
        },
    );

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        store,
    };

    match cli.command {
        Commands::Demo(args) => demo::run(args, &ctx).await,
        Commands::Load(args) => load::run(args, &ctx).await,
    }
}
