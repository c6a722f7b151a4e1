//! `sismos invoke` - handle an invocation event

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use super::print_response;

#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Event JSON file (default: read stdin)
    #[arg(short, long)]
    pub event: Option<PathBuf>,
}

pub fn run(args: InvokeArgs, config: sismos_igp::Config) -> Result<ExitCode> {
    config.validate()?;

    let raw = match &args.event {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read event from stdin")?;
            buf
        }
    };
    let event = parse_event(&raw)?;

    let response = sismos_igp::handle(&event, &config);
    print_response(&response)
}

/// Blank input is an empty event.
fn parse_event(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).context("Event is not valid JSON")
}
