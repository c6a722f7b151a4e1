//! sismos - reported seismic events scraper
//!
//! Fetches the latest reported events, keeps the top-N in a persisted
//! collection, and falls back to a CSV file when the collection is not
//! available.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "sismos")]
#[command(about = "Scrape reported seismic events into a replace-all collection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./sismos.toml or ~/.config/sismos/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline once and print the response
    Run(cmd::run::RunArgs),
    /// Handle an invocation event (JSON from a file or stdin)
    Invoke(cmd::invoke::InvokeArgs),
    /// Show the currently published collection
    Show(cmd::show::ShowArgs),
    /// Show effective configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(sismos_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, spinners show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    sismos_core::init_logging(quiet, cli.debug, multi);

    let file_config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };
    sismos_core::set_http_config(file_config.http_config());

    let pipeline = file_config.pipeline(|key| std::env::var(key).ok())?;

    match cli.command {
        Command::Run(args) => cmd::run::run(args, pipeline, &progress),
        Command::Invoke(args) => cmd::invoke::run(args, pipeline),
        Command::Show(args) => cmd::show::run(args, &pipeline).map(|()| ExitCode::SUCCESS),
        Command::Config => {
            cmd::print_config(&pipeline, &file_config);
            Ok(ExitCode::SUCCESS)
        }
    }
}
