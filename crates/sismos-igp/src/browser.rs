//! Rendered acquisition through headless chromium
//!
//! The browser is launched per call and closed before returning, whatever
//! the outcome, so repeated runs in a long-lived host do not accumulate
//! orphaned chromium processes.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::{Stream, StreamExt};
use sismos_core::{AcquireError, SHARED_RUNTIME};
use url::Url;

use crate::acquire::{Document, PageAcquirer, parse_url};

/// Interval between selector checks
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Bound on waiting for the chromium process to exit
const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Flags for sandboxed, resource-constrained hosts (containers, lambdas)
const CHROME_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--single-process",
    "--no-zygote",
];

/// Runs the page's scripts, waits for the table, reads the final markup.
#[derive(Debug, Clone)]
pub struct RenderedAcquirer {
    selector: String,
    timeout: Duration,
    chrome_path: Option<PathBuf>,
}

impl RenderedAcquirer {
    pub fn new(selector: &str, timeout: Duration, chrome_path: Option<PathBuf>) -> Self {
        Self {
            selector: selector.to_string(),
            timeout,
            chrome_path,
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, AcquireError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.timeout);
        for arg in CHROME_ARGS {
            builder = builder.arg(*arg);
        }
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(AcquireError::Browser)
    }

    /// Render `url`, returning the markup and the page's final URL.
    async fn render(&self, url: &str) -> Result<(String, Option<String>), AcquireError> {
        let (mut browser, handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(cdp_err)?;
        log::debug!("rendered: browser launched");

        let handler_task = tokio::spawn(drain_events(handler));

        let result = self.capture(&browser, url).await;

        if let Err(e) = browser.close().await {
            log::warn!("rendered: browser close failed, killing: {e}");
            if let Some(Err(e)) = browser.kill().await {
                log::warn!("rendered: browser kill failed: {e}");
            }
        }
        match tokio::time::timeout(EXIT_TIMEOUT, browser.wait()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => log::warn!("rendered: waiting for browser exit failed: {e}"),
            Err(_) => {
                log::warn!(
                    "rendered: browser still running after {}s, killing",
                    EXIT_TIMEOUT.as_secs()
                );
                if let Some(Err(e)) = browser.kill().await {
                    log::warn!("rendered: browser kill failed: {e}");
                }
            }
        }
        handler_task.abort();
        log::debug!("rendered: browser released");

        result
    }

    async fn capture(
        &self,
        browser: &Browser,
        url: &str,
    ) -> Result<(String, Option<String>), AcquireError> {
        let navigation = async {
            let page = browser.new_page(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(page)
        };
        let page = tokio::time::timeout(self.timeout, navigation)
            .await
            .map_err(|_| AcquireError::Timeout {
                what: format!("navigation to {url}"),
                after: self.timeout,
            })?
            .map_err(cdp_err)?;

        self.wait_for_selector(&page).await?;
        let markup = page.content().await.map_err(cdp_err)?;
        let final_url = match page.url().await {
            Ok(final_url) => final_url,
            Err(e) => {
                log::debug!("rendered: final URL unavailable: {e}");
                None
            }
        };
        Ok((markup, final_url))
    }

    /// Poll until the table selector matches, bounded by the timeout.
    async fn wait_for_selector(&self, page: &Page) -> Result<(), AcquireError> {
        let poll = async {
            loop {
                if page.find_element(self.selector.as_str()).await.is_ok() {
                    return;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(self.timeout, poll)
            .await
            .map_err(|_| AcquireError::Timeout {
                what: format!("selector `{}`", self.selector),
                after: self.timeout,
            })
    }
}

fn cdp_err(e: chromiumoxide::error::CdpError) -> AcquireError {
    AcquireError::Browser(e.to_string())
}

/// Poll the CDP event stream until it ends. Event errors are logged and
/// polling continues; the browser connection lives as long as this runs.
/// Returns the number of errors seen.
async fn drain_events<S, E>(mut events: S) -> usize
where
    S: Stream<Item = Result<(), E>> + Unpin,
    E: std::fmt::Display,
{
    let mut errors = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            errors += 1;
            log::debug!("rendered: handler event error: {e}");
        }
    }
    errors
}

/// Base URL for link resolution: the page's final URL when it parses,
/// else the requested one.
fn resolve_base(requested: Url, reported: Option<String>) -> Url {
    reported
        .and_then(|u| Url::parse(&u).ok())
        .filter(|u| u.scheme() == "http" || u.scheme() == "https")
        .unwrap_or(requested)
}

impl PageAcquirer for RenderedAcquirer {
    fn name(&self) -> &'static str {
        "rendered"
    }

    fn acquire(&self, url: &str) -> Result<Document, AcquireError> {
        let requested = parse_url(url)?;
        let (markup, final_url) = SHARED_RUNTIME.handle().block_on(self.render(url))?;
        let base_url = resolve_base(requested, final_url);
        log::debug!("rendered: {} bytes from {base_url}", markup.len());
        Ok(Document::Html { base_url, markup })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builds_with_explicit_binary() {
        let acq = RenderedAcquirer::new(
            "table.tabla",
            Duration::from_secs(10),
            Some(PathBuf::from("/usr/bin/chromium-browser")),
        );
        assert!(acq.browser_config().is_ok());
    }

    #[test]
    fn event_errors_do_not_stop_polling() {
        let events = futures_util::stream::iter(vec![
            Ok(()),
            Err("unknown event"),
            Ok(()),
            Err("bad message"),
            Ok(()),
        ]);
        let errors = SHARED_RUNTIME.block_on(drain_events(events));
        assert_eq!(errors, 2);
    }

    #[test]
    fn base_url_follows_redirects() {
        let requested = Url::parse("https://ultimosismo.igp.gob.pe/ultimo-sismo").unwrap();
        let redirected = resolve_base(
            requested.clone(),
            Some("https://ultimosismo.igp.gob.pe/ultimo-sismo/sismos-reportados".to_string()),
        );
        assert_eq!(redirected.path(), "/ultimo-sismo/sismos-reportados");

        assert_eq!(resolve_base(requested.clone(), None), requested);
        assert_eq!(
            resolve_base(requested.clone(), Some("about:blank".to_string())),
            requested
        );
    }

    #[test]
    fn invalid_url_fails_before_launch() {
        let acq = RenderedAcquirer::new("table.tabla", Duration::from_secs(1), None);
        let err = acq.acquire("::not-a-url").unwrap_err();
        assert!(matches!(err, AcquireError::InvalidUrl(_)));
    }
}
