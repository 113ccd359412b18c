//! Kino VAST CLI - Headless ad-insertion simulator
//!
//! Features:
//! - Scenario validation and break schedule listing
//! - Scenario playback on the tokio driver
//! - Tracking beacon reports (text or JSON)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Kino VAST CLI - Ad insertion simulator
#[derive(Parser)]
#[command(name = "kino-vast-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Simulate VAST ad breaks against a scripted video element", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario and report the beacons it fires
    Simulate {
        /// Path to scenario JSON
        scenario: PathBuf,

        /// Simulation speed relative to real time
        #[arg(short, long, default_value = "10")]
        speed: f64,

        /// Simulated milliseconds per clock tick
        #[arg(short, long, default_value = "50")]
        tick_ms: u64,

        /// Stop after this many simulated seconds
        #[arg(short, long)]
        limit: Option<f64>,
    },

    /// Validate a scenario and list its ad breaks
    Check {
        /// Path to scenario JSON
        scenario: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Simulate { scenario, speed, tick_ms, limit } => {
            let options = commands::SimulateOptions { speed, tick_ms, limit };
            commands::simulate(&scenario, options, &cli.format).await?;
        }
        Commands::Check { scenario } => {
            commands::check(&scenario, &cli.format)?;
        }
    }

    Ok(())
}
