//! Invocation entry point: event in, `{statusCode, body}` out

use serde::Serialize;
use serde_json::Value;
use sismos_core::{ProgressContext, RunError};

use crate::config::Config;
use crate::runner::{Persisted, RunOutcome, run};

/// Response envelope returned to the invoking host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Envelope for a finished run.
    ///
    /// The body lists the stored items (with identifiers) when the
    /// collection was replaced, otherwise the extracted records.
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let body = match &outcome.persisted {
            Persisted::Store { report, .. } => serde_json::to_value(&report.stored),
            Persisted::Csv { .. } | Persisted::Unsaved { .. } => {
                serde_json::to_value(&outcome.records)
            }
        };
        Self::success(body)
    }

    /// 200 with `body`, or 500 when the body could not be serialized.
    fn success(body: serde_json::Result<Value>) -> Self {
        match body {
            Ok(body) => Self {
                status_code: 200,
                body,
            },
            Err(e) => {
                log::error!("Cannot serialize response body: {e}");
                Self {
                    status_code: 500,
                    body: Value::String(format!("response serialization failed: {e}")),
                }
            }
        }
    }

    pub fn from_error(err: &RunError) -> Self {
        Self {
            status_code: err.status_code(),
            body: Value::String(err.to_string()),
        }
    }
}

/// Handle one invocation.
///
/// The event is opaque except for an optional positive integer `limit`,
/// which overrides the configured one for this run.
pub fn handle(event: &Value, config: &Config) -> Response {
    let mut config = config.clone();
    if let Some(limit) = event_limit(event) {
        log::debug!("event overrides limit: {} -> {limit}", config.limit);
        config.limit = limit;
    }

    respond(run(&config, &ProgressContext::hidden()))
}

/// Map a run result onto the response envelope.
pub fn respond(result: Result<RunOutcome, RunError>) -> Response {
    match result {
        Ok(outcome) => Response::from_outcome(&outcome),
        Err(e) => {
            let response = Response::from_error(&e);
            log::warn!("Responding {}: {e}", response.status_code);
            response
        }
    }
}

fn event_limit(event: &Value) -> Option<usize> {
    let limit = event.get("limit")?;
    let parsed = match limit {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    match parsed.and_then(|n| usize::try_from(n).ok()) {
        Some(n) if n > 0 => Some(n),
        _ => {
            log::warn!("Ignoring invalid event limit: {limit}");
            None
        }
    }
}
