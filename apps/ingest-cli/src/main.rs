mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "procura-ingest", version, about = "Upload supplier documents to Procura")]
struct Cli {
    /// Config file (default: ~/.config/procura/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL
    #[arg(long, env = "PROCURA_SERVER_URL", global = true)]
    server: Option<String>,

    /// API token sent as a Bearer header
    #[arg(long, env = "PROCURA_API_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload documents one at a time; Ctrl-C cancels the current file
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Sync documents for an inclusive date range
    Sync {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        /// Days per window (default from config)
        #[arg(long)]
        window_days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,procura=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli.server, cli.token);

    let ok = match cli.command {
        Command::Upload { files } => commands::upload(&config, files).await?,
        Command::Sync {
            from,
            to,
            window_days,
        } => commands::sync(&config, from, to, window_days).await?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::from(1) })
}
