//! Pipeline execution: acquire → extract → sync, with CSV fallback

use std::path::PathBuf;
use std::time::{Duration, Instant};

use sismos_core::{ExtractError, ProgressContext, RowSkip, RunError, SeismicRecord};
use sismos_store::{DatasetSynchronizer, FileStore, RecordStore, SyncReport, write_csv};

use crate::acquire::{Document, PageAcquirer, acquirer_for};
use crate::config::Config;
use crate::extract::{Extraction, TableExtractor};
use crate::payload::JsonExtractor;

/// Where the extracted batch ended up.
#[derive(Debug)]
pub enum Persisted {
    /// Collection replaced with a new generation
    Store { collection: String, report: SyncReport },
    /// Written to the fallback CSV file
    Csv { path: PathBuf, rows: usize },
    /// Neither the store nor the CSV file could be written
    Unsaved { reason: String },
}

impl std::fmt::Display for Persisted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store { collection, report } => write!(
                f,
                "{collection} (generation {}, {} stored, {} removed)",
                report.generation,
                report.stored.len(),
                report.removed
            ),
            Self::Csv { path, rows } => write!(f, "{} ({rows} rows)", path.display()),
            Self::Unsaved { reason } => write!(f, "not saved: {reason}"),
        }
    }
}

/// Result of a run that got past acquisition and extraction.
#[derive(Debug)]
pub struct RunOutcome {
    /// Extracted records, source order
    pub records: Vec<SeismicRecord>,
    pub skipped: Vec<RowSkip>,
    pub persisted: Persisted,
    pub elapsed: Duration,
}

/// Run the pipeline with the acquirer and file store selected by `config`.
///
/// The store is opened only after extraction succeeded, so a failed fetch
/// or a missing table never touches persistence. A store that cannot be
/// opened degrades to the CSV fallback like any other sync failure.
pub fn run(config: &Config, progress: &ProgressContext) -> Result<RunOutcome, RunError> {
    let acquirer = acquirer_for(config)?;
    let started = Instant::now();
    log_start(config, acquirer.as_ref());

    let extraction = collect(config, acquirer.as_ref(), progress)?;

    let persisted = match &config.table {
        Some(table) => match FileStore::open(&config.store_dir, table) {
            Ok(store) => persist(config, &extraction.records, Some(&store), progress),
            Err(e) => {
                log::warn!("Cannot open store {table}, falling back to CSV: {e:#}");
                write_fallback(config, &extraction.records)
            }
        },
        None => persist(config, &extraction.records, None, progress),
    };

    Ok(finish(extraction, persisted, started))
}

/// Run the pipeline against an explicit acquirer and store.
///
/// `store = None` behaves like an unconfigured collection: output goes to
/// the CSV file.
pub fn run_with(
    config: &Config,
    acquirer: &dyn PageAcquirer,
    store: Option<&dyn RecordStore>,
    progress: &ProgressContext,
) -> Result<RunOutcome, RunError> {
    let started = Instant::now();
    log_start(config, acquirer);

    let extraction = collect(config, acquirer, progress)?;
    let persisted = persist(config, &extraction.records, store, progress);

    Ok(finish(extraction, persisted, started))
}

fn log_start(config: &Config, acquirer: &dyn PageAcquirer) {
    log::info!(
        "sismos starting: source={}, strategy={}, limit={}, table={}",
        config.source_url,
        acquirer.name(),
        config.limit,
        config.table.as_deref().unwrap_or("-")
    );
}

fn finish(extraction: Extraction, persisted: Persisted, started: Instant) -> RunOutcome {
    let elapsed = started.elapsed();
    log::info!(
        "sismos completed: {} records, {} skipped, saved to {persisted} in {:.1}s",
        extraction.records.len(),
        extraction.skipped.len(),
        elapsed.as_secs_f64()
    );
    RunOutcome {
        records: extraction.records,
        skipped: extraction.skipped,
        persisted,
        elapsed,
    }
}

/// Acquire and extract. Either failure ends the run.
fn collect(
    config: &Config,
    acquirer: &dyn PageAcquirer,
    progress: &ProgressContext,
) -> Result<Extraction, RunError> {
    let pb = progress.stage_line("fetch");
    pb.set_message(format!("{} {}", acquirer.name(), config.source_url));
    let document = match acquirer.acquire(&config.source_url) {
        Ok(document) => document,
        Err(e) => {
            pb.finish_with_message(format!("failed: {e}"));
            log::error!("Acquisition failed: {e}");
            return Err(e.into());
        }
    };
    pb.finish_with_message("done");

    let pb = progress.stage_line("extract");
    match extract_document(config, document) {
        Ok(extraction) => {
            pb.finish_with_message(format!(
                "{} records, {} skipped",
                extraction.records.len(),
                extraction.skipped.len()
            ));
            Ok(extraction)
        }
        Err(e) => {
            pb.finish_with_message(format!("failed: {e}"));
            log::error!("Extraction failed: {e}");
            Err(e.into())
        }
    }
}

fn extract_document(config: &Config, document: Document) -> Result<Extraction, ExtractError> {
    match document {
        Document::Html { base_url, markup } => {
            TableExtractor::new(&config.table_selector, config.schema, config.limit)?
                .extract(&markup, &base_url)
        }
        Document::Json { base_url, payload } => {
            JsonExtractor::new(config.json_fields.clone(), config.limit).extract(&payload, &base_url)
        }
    }
}

/// Sync into `store`, or write the CSV file when there is none or the
/// sync fails. Never fails the run.
fn persist(
    config: &Config,
    records: &[SeismicRecord],
    store: Option<&dyn RecordStore>,
    progress: &ProgressContext,
) -> Persisted {
    let Some(store) = store else {
        log::info!("No collection configured, writing CSV");
        return write_fallback(config, records);
    };

    let pb = progress.stage_line("sync");
    pb.set_message(store.collection().to_string());
    match DatasetSynchronizer::new(store).sync(records.to_vec()) {
        Ok(report) => {
            pb.finish_with_message(format!("{} stored", report.stored.len()));
            Persisted::Store {
                collection: store.collection().to_string(),
                report,
            }
        }
        Err(e) => {
            pb.finish_with_message("failed");
            log::warn!("Sync failed, falling back to CSV: {e:#}");
            write_fallback(config, records)
        }
    }
}

fn write_fallback(config: &Config, records: &[SeismicRecord]) -> Persisted {
    match write_csv(&config.csv_path, records) {
        Ok(rows) => Persisted::Csv {
            path: config.csv_path.clone(),
            rows,
        },
        Err(e) => {
            log::error!("CSV fallback failed: {e:#}");
            Persisted::Unsaved {
                reason: format!("{e:#}"),
            }
        }
    }
}
