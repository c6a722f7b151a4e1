//! Sismos IGP - reported seismic events pipeline
//!
//! Acquires the list of recently reported events (static HTML, rendered
//! HTML, or JSON API), extracts the top-N rows, and replaces the persisted
//! collection with them.
//!
//! # Example
//!
//! ```ignore
//! use sismos_core::ProgressContext;
//! use sismos_igp::{Config, run};
//!
//! let config = Config {
//!     limit: 5,
//!     table: Some("SismosReportados".into()),
//!     ..Default::default()
//! };
//!
//! let outcome = run(&config, &ProgressContext::hidden())?;
//! println!("{} events", outcome.records.len());
//! ```

pub mod acquire;
#[cfg(feature = "browser")]
pub mod browser;
pub mod config;
pub mod extract;
pub mod handler;
pub mod payload;
pub mod runner;

// Re-exports
pub use acquire::{ApiAcquirer, Document, PageAcquirer, StaticAcquirer, acquirer_for};
pub use config::{Config, JsonFields, RowSchema, Strategy};
pub use extract::{Extraction, TableExtractor, normalize_text};
pub use handler::{Response, handle, respond};
pub use payload::JsonExtractor;
pub use runner::{Persisted, RunOutcome, run, run_with};
