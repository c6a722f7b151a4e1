//! Pipeline configuration

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Page listing the most recent reported events.
pub const DEFAULT_SOURCE_URL: &str = "https://ultimosismo.igp.gob.pe/ultimo-sismo/sismos-reportados";

/// How the source document is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Plain GET of the server-delivered markup
    Static,
    /// Headless browser, wait for the table, read the rendered markup
    Rendered,
    /// GET of a JSON endpoint
    Api,
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "rendered" | "browser" => Ok(Self::Rendered),
            "api" | "json" => Ok(Self::Api),
            other => anyhow::bail!("Unknown strategy: {other} (expected static, rendered, api)"),
        }
    }
}

/// Positional column layout of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowSchema {
    /// date, time, latitude, longitude, depth, magnitude, place
    Tabular,
    /// reference, date-time, magnitude, plus the row's report link
    Linked,
}

impl RowSchema {
    /// Cells a row must have to be mapped.
    pub const fn required_cells(self) -> usize {
        match self {
            Self::Tabular => 7,
            Self::Linked => 3,
        }
    }
}

impl FromStr for RowSchema {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tabular" => Ok(Self::Tabular),
            "linked" => Ok(Self::Linked),
            other => anyhow::bail!("Unknown row schema: {other} (expected tabular, linked)"),
        }
    }
}

/// Keys of a JSON event object mapped onto record fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JsonFields {
    /// Joined with a space, in order
    pub occurred_at: Vec<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub depth: Option<String>,
    pub magnitude: String,
    pub place: String,
    pub report_url: Option<String>,
}

impl Default for JsonFields {
    fn default() -> Self {
        Self {
            occurred_at: vec!["fecha_local".to_string(), "hora_local".to_string()],
            latitude: Some("latitud".to_string()),
            longitude: Some("longitud".to_string()),
            depth: Some("profundidad".to_string()),
            magnitude: "magnitud".to_string(),
            place: "referencia".to_string(),
            report_url: None,
        }
    }
}

/// Runtime configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct Config {
    pub source_url: String,
    pub strategy: Strategy,
    /// Structural anchor of the events table
    pub table_selector: String,
    pub schema: RowSchema,
    pub json_fields: JsonFields,
    /// Maximum records extracted (most recent first)
    pub limit: usize,
    /// Bound on the rendered strategy's navigation and selector waits
    pub render_timeout: Duration,
    /// Chromium binary; autodetected when unset
    pub chrome_path: Option<PathBuf>,
    /// Root directory of the file-backed record store
    pub store_dir: PathBuf,
    /// Persisted collection; `None` routes output to the CSV file
    pub table: Option<String>,
    pub csv_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            strategy: Strategy::Rendered,
            table_selector: "table.tabla".to_string(),
            schema: RowSchema::Tabular,
            json_fields: JsonFields::default(),
            limit: 10,
            render_timeout: Duration::from_secs(10),
            chrome_path: None,
            store_dir: PathBuf::from("./data"),
            table: None,
            csv_path: PathBuf::from("sismos.csv"),
        }
    }
}

impl Config {
    /// Override fields from environment-style variables.
    ///
    /// `get` is usually `|k| std::env::var(k).ok()`. Empty values are
    /// treated as unset.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("LIMIT") {
            self.limit = v
                .trim()
                .parse()
                .with_context(|| format!("LIMIT must be a positive integer, got {v:?}"))?;
        }
        if let Some(v) = var("DDB_TABLE") {
            self.table = Some(v);
        }
        if let Some(v) = var("CSV_PATH") {
            self.csv_path = PathBuf::from(v);
        }
        if let Some(v) = var("SOURCE_URL") {
            self.source_url = v;
        }
        if let Some(v) = var("STRATEGY") {
            self.strategy = v.parse()?;
        }
        if let Some(v) = var("TABLE_SELECTOR") {
            self.table_selector = v;
        }
        if let Some(v) = var("ROW_SCHEMA") {
            self.schema = v.parse()?;
        }
        if let Some(v) = var("RENDER_TIMEOUT_SECS") {
            let secs: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("RENDER_TIMEOUT_SECS must be an integer, got {v:?}"))?;
            self.render_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = var("CHROME_PATH") {
            self.chrome_path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("STORE_DIR") {
            self.store_dir = PathBuf::from(v);
        }
        Ok(())
    }

    /// Reject configurations no run could succeed with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.limit > 0, "limit must be at least 1");
        anyhow::ensure!(
            !self.table_selector.trim().is_empty(),
            "table selector must not be empty"
        );
        url::Url::parse(&self.source_url)
            .with_context(|| format!("invalid source URL: {}", self.source_url))?;
        anyhow::ensure!(
            !self.render_timeout.is_zero(),
            "render timeout must be positive"
        );
        Ok(())
    }
}
