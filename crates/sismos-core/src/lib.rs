//! Sismos Core - shared infrastructure for the seismic event pipeline
//!
//! Record model, error taxonomy, the shared HTTP client and runtime,
//! and logging/progress plumbing used by every other crate.

pub mod error;
pub mod http;
pub mod logging;
pub mod progress;
pub mod record;

// Re-exports for convenience
pub use error::{AcquireError, ExtractError, RowSkip, RunError, SkipReason};
pub use http::{HttpConfig, SHARED_RUNTIME, http_client, http_config, set_http_config};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress};
pub use record::SeismicRecord;
