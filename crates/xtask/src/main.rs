//! Development tasks for the behavior tree workspace
//!
//! This binary provides development utilities using the cargo-xtask pattern.
//! Run with: `cargo xtask <command>`

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Fuzz, Render};
use config::XtaskConfig;

/// Development tasks for the behavior tree workspace
#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tools for the behavior tree engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Tick many random trees and check engine invariants
    Fuzz(Fuzz),

    /// Tick one random tree and print it
    Render(Render),
}

fn main() -> Result<()> {
    // Load .env file if it exists (for BT_* defaults)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = XtaskConfig::from_env();
    let cli = Cli::parse();

    match cli.command {
        Command::Fuzz(cmd) => cmd.execute(&config),
        Command::Render(cmd) => cmd.execute(&config),
    }
}
