//! Source document acquisition
//!
//! One attempt per run: no retries, no backoff.

use reqwest::StatusCode;
use sismos_core::{AcquireError, SHARED_RUNTIME, http_client};
use url::Url;

use crate::config::{Config, Strategy};

/// An acquired source document, handed by value to extraction.
#[derive(Debug, Clone)]
pub enum Document {
    /// Markup plus the URL relative links resolve against
    Html { base_url: Url, markup: String },
    /// Decoded JSON payload
    Json {
        base_url: Url,
        payload: serde_json::Value,
    },
}

/// Obtains the source document for a URL.
pub trait PageAcquirer {
    /// Short strategy name, for logs.
    fn name(&self) -> &'static str;

    fn acquire(&self, url: &str) -> Result<Document, AcquireError>;
}

/// Build the acquirer selected by `config.strategy`.
pub fn acquirer_for(config: &Config) -> Result<Box<dyn PageAcquirer>, AcquireError> {
    match config.strategy {
        Strategy::Static => Ok(Box::new(StaticAcquirer)),
        Strategy::Api => Ok(Box::new(ApiAcquirer)),
        #[cfg(feature = "browser")]
        Strategy::Rendered => Ok(Box::new(crate::browser::RenderedAcquirer::new(
            &config.table_selector,
            config.render_timeout,
            config.chrome_path.clone(),
        ))),
        #[cfg(not(feature = "browser"))]
        Strategy::Rendered => Err(AcquireError::Browser(
            "built without the `browser` feature".to_string(),
        )),
    }
}

pub(crate) fn parse_url(url: &str) -> Result<Url, AcquireError> {
    Url::parse(url).map_err(|e| AcquireError::InvalidUrl(format!("{url}: {e}")))
}

/// Single GET; anything but 200 is an error carrying the status.
///
/// Returns the final URL (after redirects) and the body text.
fn fetch_text(url: &str) -> Result<(Url, String), AcquireError> {
    let target = parse_url(url)?;
    SHARED_RUNTIME.handle().block_on(async {
        let response = http_client()
            .get(target)
            .send()
            .await
            .map_err(|e| AcquireError::from_reqwest(&e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AcquireError::Http {
                status: Some(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| AcquireError::from_reqwest(&e))?;
        Ok((final_url, body))
    })
}

/// Reads the server-delivered markup without running any script.
///
/// Pages that fill their table client-side come back without it, which
/// extraction then reports as table-not-found.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticAcquirer;

impl PageAcquirer for StaticAcquirer {
    fn name(&self) -> &'static str {
        "static"
    }

    fn acquire(&self, url: &str) -> Result<Document, AcquireError> {
        let (base_url, markup) = fetch_text(url)?;
        log::debug!("static: {} bytes from {base_url}", markup.len());
        Ok(Document::Html { base_url, markup })
    }
}

/// Fetches a JSON endpoint listing the events.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApiAcquirer;

impl PageAcquirer for ApiAcquirer {
    fn name(&self) -> &'static str {
        "api"
    }

    fn acquire(&self, url: &str) -> Result<Document, AcquireError> {
        let (base_url, body) = fetch_text(url)?;
        let payload = serde_json::from_str(&body).map_err(|e| AcquireError::Http {
            status: None,
            message: format!("invalid JSON from {base_url}: {e}"),
        })?;
        Ok(Document::Json { base_url, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_is_rejected_before_any_request() {
        let err = StaticAcquirer.acquire("not a url").unwrap_err();
        assert!(matches!(err, AcquireError::InvalidUrl(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn strategy_selects_acquirer() {
        let config = Config {
            strategy: Strategy::Static,
            ..Default::default()
        };
        assert_eq!(acquirer_for(&config).unwrap().name(), "static");

        let config = Config {
            strategy: Strategy::Api,
            ..Default::default()
        };
        assert_eq!(acquirer_for(&config).unwrap().name(), "api");
    }

    #[cfg(feature = "browser")]
    #[test]
    fn rendered_strategy_uses_browser() {
        let config = Config::default();
        assert_eq!(acquirer_for(&config).unwrap().name(), "rendered");
    }
}
