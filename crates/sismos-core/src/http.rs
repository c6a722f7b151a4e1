//! Shared HTTP client and tokio runtime.
//!
//! Uses async reqwest internally, but the pipeline is a single sequential
//! run, so callers drive futures through [`SHARED_RUNTIME`] with `block_on`.

use std::sync::{LazyLock, OnceLock};
use std::time::Duration;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Whole-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport settings applied once at startup.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            user_agent: concat!("sismos/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

static HTTP_CONFIG: OnceLock<HttpConfig> = OnceLock::new();

/// Install transport settings. Must run before the first request;
/// later calls are ignored.
pub fn set_http_config(config: HttpConfig) {
    if HTTP_CONFIG.set(config).is_err() {
        log::debug!("HTTP config already initialized, ignoring override");
    }
}

/// Current transport settings (defaults when never set).
pub fn http_config() -> &'static HttpConfig {
    HTTP_CONFIG.get_or_init(HttpConfig::default)
}

/// Shared async HTTP client.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    let cfg = http_config();
    reqwest::Client::builder()
        .connect_timeout(cfg.connect_timeout)
        .timeout(cfg.request_timeout)
        .user_agent(cfg.user_agent.clone())
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP and browser operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});
