//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use sismos_core::HttpConfig;
use sismos_igp::{JsonFields, RowSchema, Strategy};

/// File-level configuration for sismos
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub browser: BrowserConfig,
    pub output: OutputConfig,
    pub http: HttpSection,
    pub json: JsonFields,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub strategy: Strategy,
    pub table_selector: String,
    pub schema: RowSchema,
    pub limit: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let defaults = sismos_igp::Config::default();
        Self {
            url: defaults.source_url,
            strategy: defaults.strategy,
            table_selector: defaults.table_selector,
            schema: defaults.schema,
            limit: defaults.limit,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub render_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub chrome_path: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            render_timeout_secs: 10,
            chrome_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Persisted collection; unset routes output to `csv_path`
    #[serde(deserialize_with = "deserialize_env_var")]
    pub table: Option<String>,
    pub store_dir: PathBuf,
    pub csv_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table: None,
            store_dir: PathBuf::from("./data"),
            csv_path: PathBuf::from("sismos.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpSection {
    fn default() -> Self {
        let defaults = HttpConfig::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            user_agent: None,
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./sismos.toml (current directory)
    /// 2. ~/.config/sismos/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("sismos.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "sismos") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Transport settings for [`sismos_core::set_http_config`].
    pub fn http_config(&self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.http.request_timeout_secs),
            user_agent: self.http.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }

    /// Pipeline configuration: file values, then environment overrides.
    pub fn pipeline(&self, env: impl Fn(&str) -> Option<String>) -> Result<sismos_igp::Config> {
        let mut config = sismos_igp::Config {
            source_url: self.source.url.clone(),
            strategy: self.source.strategy,
            table_selector: self.source.table_selector.clone(),
            schema: self.source.schema,
            json_fields: self.json.clone(),
            limit: self.source.limit,
            render_timeout: Duration::from_secs(self.browser.render_timeout_secs),
            chrome_path: self.browser.chrome_path.as_ref().map(PathBuf::from),
            store_dir: self.output.store_dir.clone(),
            table: self.output.table.clone(),
            csv_path: self.output.csv_path.clone(),
        };
        config
            .apply_env(env)
            .context("Invalid environment configuration")?;
        Ok(config)
    }
}
