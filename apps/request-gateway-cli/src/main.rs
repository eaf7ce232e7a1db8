use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

use config::{AppConfig, CliOverrides};

/// Request Gateway - fetch and submit JSON over HTTP
#[derive(Parser, Debug)]
#[command(name = "request-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base URL override (overrides config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout override, e.g. `10s` (overrides config)
    #[arg(long, global = true)]
    timeout: Option<String>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Fetch(commands::FetchArgs),
    Submit(commands::SubmitArgs),
    /// Validate configuration and print it
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (REQUEST_GATEWAY__*) -> 4) CLI overrides
    let overrides = CliOverrides {
        base_url: cli.base_url,
        timeout: cli.timeout,
    };
    let config = AppConfig::load(cli.config.as_deref(), &overrides)?;

    logging::init(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Fetch(args) => args.run(config),
        Commands::Submit(args) => args.run(config),
        Commands::Check => commands::check(&config),
    }
}
