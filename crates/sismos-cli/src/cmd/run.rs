//! `sismos run` - execute the pipeline once

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use sismos_core::SharedProgress;
use sismos_igp::{RowSchema, Strategy};

use super::print_response;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Maximum number of events to keep
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Acquisition strategy (static, rendered, api)
    #[arg(short, long)]
    pub strategy: Option<Strategy>,

    /// Source page or endpoint
    #[arg(short, long)]
    pub url: Option<String>,

    /// CSS selector of the events table
    #[arg(long)]
    pub selector: Option<String>,

    /// Column layout of table rows (tabular, linked)
    #[arg(long)]
    pub schema: Option<RowSchema>,

    /// Persisted collection name
    #[arg(short, long)]
    pub table: Option<String>,

    /// CSV fallback path
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

impl RunArgs {
    /// CLI flags take precedence over file and environment.
    pub fn apply(self, config: &mut sismos_igp::Config) {
        if let Some(limit) = self.limit {
            config.limit = limit;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(url) = self.url {
            config.source_url = url;
        }
        if let Some(selector) = self.selector {
            config.table_selector = selector;
        }
        if let Some(schema) = self.schema {
            config.schema = schema;
        }
        if let Some(table) = self.table {
            config.table = Some(table);
        }
        if let Some(csv) = self.csv {
            config.csv_path = csv;
        }
    }
}

pub fn run(args: RunArgs, mut config: sismos_igp::Config, progress: &SharedProgress) -> Result<ExitCode> {
    args.apply(&mut config);
    config.validate()?;

    let response = sismos_igp::respond(sismos_igp::run(&config, progress));
    print_response(&response)
}
