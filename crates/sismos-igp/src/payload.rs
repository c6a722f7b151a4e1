//! JSON event payload extraction

use serde_json::Value;
use sismos_core::{ExtractError, SeismicRecord, SkipReason};
use url::Url;

use crate::config::JsonFields;
use crate::extract::{Extraction, normalize_text, resolve_link};

/// Maps JSON event objects onto records through a [`JsonFields`] key map.
#[derive(Debug, Clone)]
pub struct JsonExtractor {
    fields: JsonFields,
    limit: usize,
}

impl JsonExtractor {
    pub fn new(fields: JsonFields, limit: usize) -> Self {
        Self { fields, limit }
    }

    /// Extract up to `limit` records from the payload's event array.
    ///
    /// The array is either the payload itself or its `data` member.
    pub fn extract(&self, payload: &Value, base_url: &Url) -> Result<Extraction, ExtractError> {
        let items = match payload {
            Value::Array(items) => items,
            Value::Object(map) => match map.get("data") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(ExtractError::InvalidPayload(
                        "object without a `data` array".to_string(),
                    ));
                }
            },
            other => {
                return Err(ExtractError::InvalidPayload(format!(
                    "expected array, got {}",
                    kind(other)
                )));
            }
        };

        let mut out = Extraction::default();
        for (idx, item) in items.iter().take(self.limit).enumerate() {
            out.push(idx + 1, self.map_item(item, base_url));
        }
        log::debug!(
            "extracted {} records ({} items skipped) from JSON payload",
            out.records.len(),
            out.skipped.len()
        );
        Ok(out)
    }

    fn map_item(&self, item: &Value, base_url: &Url) -> Result<SeismicRecord, SkipReason> {
        let required = |key: &str| {
            scalar(item, key).ok_or_else(|| SkipReason::MissingKey {
                key: key.to_string(),
            })
        };
        let optional = |key: &Option<String>| key.as_deref().and_then(|k| scalar(item, k));

        let mut parts = Vec::with_capacity(self.fields.occurred_at.len());
        for key in &self.fields.occurred_at {
            parts.push(required(key.as_str())?);
        }
        let occurred_at = normalize_text(&parts.join("\n"));
        let magnitude = required(self.fields.magnitude.as_str())?;

        let report_url = match optional(&self.fields.report_url) {
            Some(href) => Some(resolve_link(&href, base_url)?),
            None => None,
        };

        Ok(SeismicRecord {
            occurred_at,
            latitude: optional(&self.fields.latitude),
            longitude: optional(&self.fields.longitude),
            depth: optional(&self.fields.depth),
            magnitude,
            place: required(self.fields.place.as_str())?,
            report_url,
        })
    }
}

/// Scalar value at `key` as text; `None` when absent, null, or nested.
fn scalar(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) => Some(normalize_text(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
