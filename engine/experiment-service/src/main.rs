//! Carbon Market Experiment Service
//!
//! Entry point for the `carbon-market` binary: loads configuration, sets up
//! logging and runs the requested command.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use experiment_service::{
    config::{save_config, validate_config},
    initialize_logging, load_configuration, ExperimentService, ReplayScript, ServiceConfig,
};
use persistence::StoreBackend;

#[derive(Parser)]
#[command(name = "carbon-market", version, about = "Carbon market experiment engine")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Override the configured log format (pretty, compact, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive a recorded session through the market and print the round report
    Replay {
        /// JSON session script
        script: PathBuf,

        /// Persist group state as files under this directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration as TOML
    InitConfig { path: PathBuf },

    /// Load and validate the configuration, then print it
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::InitConfig { path } = &cli.command {
        save_config(&ServiceConfig::default(), path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = load_configuration(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    if let Command::Replay { data_dir: Some(dir), .. } = &cli.command {
        config.persistence.data_dir = dir.clone();
        config.persistence.backend = StoreBackend::Local;
    }
    validate_config(&config)?;

    initialize_logging(&config.logging)?;
    info!("Starting Carbon Market Service v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Replay { script, json, .. } => {
            let script = ReplayScript::from_file(&script)
                .with_context(|| format!("Failed to load script {}", script.display()))?;
            let service = ExperimentService::new(config)?;

            // The market holds blocking locks for each event.
            let report = tokio::task::spawn_blocking(move || service.replay(&script))
                .await
                .context("Replay task failed")??;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
        }
        Command::CheckConfig => {
            println!("{}", toml::to_string_pretty(&config).context("Failed to render configuration")?);
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}
