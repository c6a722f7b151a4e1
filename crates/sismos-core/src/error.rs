//! Error taxonomy for the fetch → extract → sync pipeline
//!
//! Acquisition and table-location failures are terminal for a run and map
//! to a response status. Row-level problems are never errors: they surface
//! as [`RowSkip`] values next to the records that did parse.

use std::time::Duration;

/// Failure to obtain the source document.
#[derive(Debug)]
pub enum AcquireError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// A bounded wait expired (request, navigation, or selector)
    Timeout { what: String, after: Duration },
    /// Browser launch, navigation, or CDP failure
    Browser(String),
    /// Target URL could not be parsed
    InvalidUrl(String),
}

impl std::fmt::Display for AcquireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Timeout { what, after } => {
                write!(f, "timed out after {}s waiting for {what}", after.as_secs())
            }
            Self::Browser(msg) => write!(f, "browser: {msg}"),
            Self::InvalidUrl(msg) => write!(f, "invalid URL: {msg}"),
        }
    }
}

impl std::error::Error for AcquireError {}

impl AcquireError {
    /// Create acquisition error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout {
                what: "HTTP response".to_string(),
                after: crate::http::http_config().request_timeout,
            };
        }
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Status code reported to the caller for this failure.
    ///
    /// Upstream HTTP statuses pass through unchanged.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Http {
                status: Some(s), ..
            } => *s,
            Self::Http { status: None, .. } | Self::Browser(_) => 502,
            Self::Timeout { .. } => 504,
            Self::InvalidUrl(_) => 500,
        }
    }
}

/// Failure to locate the data inside an acquired document.
#[derive(Debug)]
pub enum ExtractError {
    /// Structural anchor absent from the document
    TableNotFound { selector: String },
    /// Configured selector is not valid CSS
    InvalidSelector { selector: String, message: String },
    /// JSON payload does not hold a record array
    InvalidPayload(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TableNotFound { selector } => {
                write!(f, "seismic table not found (selector `{selector}`)")
            }
            Self::InvalidSelector { selector, message } => {
                write!(f, "invalid selector `{selector}`: {message}")
            }
            Self::InvalidPayload(msg) => write!(f, "unexpected payload shape: {msg}"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Terminal failure of a pipeline run.
#[derive(Debug)]
pub enum RunError {
    Acquire(AcquireError),
    Extract(ExtractError),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acquire(e) => write!(f, "acquisition failed: {e}"),
            Self::Extract(e) => write!(f, "extraction failed: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Acquire(e) => Some(e),
            Self::Extract(e) => Some(e),
        }
    }
}

impl RunError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Acquire(e) => e.status_code(),
            Self::Extract(_) => 404,
        }
    }
}

impl From<AcquireError> for RunError {
    fn from(e: AcquireError) -> Self {
        Self::Acquire(e)
    }
}

impl From<ExtractError> for RunError {
    fn from(e: ExtractError) -> Self {
        Self::Extract(e)
    }
}

/// Why a single row was left out of the extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Row has fewer cells than the column schema maps
    TooFewCells { found: usize, required: usize },
    /// Row link could not be resolved to an absolute URL
    BadLink { href: String },
    /// JSON object lacks a mapped key
    MissingKey { key: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewCells { found, required } => {
                write!(f, "{found} cells, {required} required")
            }
            Self::BadLink { href } => write!(f, "unresolvable link `{href}`"),
            Self::MissingKey { key } => write!(f, "missing key `{key}`"),
        }
    }
}

/// A skipped row: its position among data rows, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSkip {
    pub row: usize,
    pub reason: SkipReason,
}

impl std::fmt::Display for RowSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row, self.reason)
    }
}
