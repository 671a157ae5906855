mod doctor;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use vaultwise_config::{AppConfig, TelemetryConfig};
use vaultwise_notes::is_cancellation;

use runner::Job;

#[derive(Debug, Parser)]
#[command(
    name = "vaultwise",
    version,
    about = "Summarize a Markdown vault inbox into weekly focus notes"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        long,
        global = true,
        env = "VAULTWISE_CONFIG",
        default_value = "config/default.toml"
    )]
    config: PathBuf,
    /// Run as if today were this date (YYYY-MM-DD).
    #[arg(long, global = true)]
    date: Option<NaiveDate>,
    /// Override `vault.root`.
    #[arg(long, global = true)]
    vault: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Summarize the inbox into this week's focus file.
    Daily,
    /// Summarize last week's archive (scheduled weekday only).
    Weekly,
    /// Review open tasks from recent weeks (scheduled weekday only).
    Backlog,
    /// Print the resolved configuration and vault paths.
    Doctor {
        #[arg(long)]
        model_catalog: bool,
    },
}

impl Commands {
    fn jobs(command: Option<&Commands>) -> Vec<Job> {
        match command {
            None => vec![Job::Daily, Job::Weekly, Job::Backlog],
            Some(Commands::Daily) => vec![Job::Daily],
            Some(Commands::Weekly) => vec![Job::Weekly],
            Some(Commands::Backlog) => vec![Job::Backlog],
            Some(Commands::Doctor { .. }) => Vec::new(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_cancellation(&err) => {
            eprintln!("cancelled");
            ExitCode::from(130)
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("load config {}", cli.config.display()))?;
    if let Some(vault) = &cli.vault {
        config.vault.root = vault.display().to_string();
    }
    config.validate()?;

    let _log_guard = init_logging(&config.telemetry)?;
    let today = cli.date.unwrap_or_else(|| Local::now().date_naive());

    if let Some(Commands::Doctor { model_catalog }) = cli.command {
        return doctor::run(&config, &cli.config, today, model_catalog).await;
    }

    runner::run_jobs(&config, today, &Commands::jobs(cli.command.as_ref())).await
}

/// Stderr logging filtered by `RUST_LOG` (or `telemetry.log_level`), plus a
/// daily-rolling file when `telemetry.log_dir` is set.  The returned guard
/// flushes the file writer on drop.
fn init_logging(telemetry: &TelemetryConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&telemetry.log_level))
        .with_context(|| format!("invalid log level {:?}", telemetry.log_level))?;

    let (file_layer, guard) = if telemetry.log_dir.trim().is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(telemetry.log_dir.trim(), "vaultwise.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;

    Ok(guard)
}
