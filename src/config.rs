use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Prefix for environment overrides, e.g. `TREND_ARCHIVE=/tmp/a.csv`.
pub const ENV_PREFIX: &str = "TREND";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config path is not valid UTF-8")]
    FilePathIntoString,
    #[error("failed to read settings: {0}")]
    SettingsInit(String),
    #[error("failed to deserialize settings: {0}")]
    Deserialize(String),
}

/// Load a typed config from `path`, with `TREND_*` environment overrides.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let filename = path
        .to_path_buf()
        .into_os_string()
        .into_string()
        .map_err(|_| ConfigError::FilePathIntoString)?;
    config::Config::builder()
        .add_source(config::File::with_name(&filename))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|err| ConfigError::SettingsInit(err.to_string()))?
        .try_deserialize()
        .map_err(|err| ConfigError::Deserialize(err.to_string()))
}

/// Where the price tables live. Shared by every binary.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceSources {
    /// Daily OHLCV CSV (ticker,date,Open,High,Low,Close,Volume)
    pub daily_prices: PathBuf,

    /// 5-minute OHLCV CSV files; later files win on duplicate bars
    #[serde(default)]
    pub intraday_prices: Vec<PathBuf>,
}

/// Config for `label_archive`.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelConfig {
    /// grok_trending selections CSV
    pub selections: PathBuf,

    #[serde(flatten)]
    pub prices: PriceSources,

    /// Cumulative archive CSV (created if missing)
    pub archive: PathBuf,

    /// Only label selections whose backtest date equals this one.
    /// Do not set to label every selection in the file.
    pub target_date: Option<NaiveDate>,

    /// Exchange holidays besides weekends and the year-end closure
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,

    /// Append each labeled record to this NDJSON file
    pub record_log: Option<PathBuf>,
}

/// Config for `fill_segments`.
#[derive(Debug, Clone, Deserialize)]
pub struct FillConfig {
    pub archive: PathBuf,

    #[serde(flatten)]
    pub prices: PriceSources,

    /// Write here instead of overwriting `archive`
    pub output: Option<PathBuf>,
}

/// Config for `segment_report`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub archive: PathBuf,

    /// HTML output path
    pub html_output: Option<PathBuf>,

    /// JSON summary output path
    pub json_output: Option<PathBuf>,

    /// Only include rows on or after this backtest date
    pub since: Option<NaiveDate>,

    #[serde(default = "default_report_title")]
    pub title: String,
}

fn default_report_title() -> String {
    "Trending selection backtest".to_string()
}

/// Config for `score_backtest`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreConfig {
    /// Archive to evaluate the models on (optional)
    pub archive: Option<PathBuf>,

    /// Archive profit column used as the realized outcome, e.g. "phase2"
    #[serde(default = "default_exit_column")]
    pub exit_column: String,

    /// Daily history for the static backtest (optional)
    pub daily_prices: Option<PathBuf>,

    /// Restrict the static backtest to these tickers; empty means all
    #[serde(default)]
    pub tickers: Vec<String>,

    /// Ignore daily bars before this date
    pub since: Option<NaiveDate>,

    /// Minimum bars of history before a ticker is scored
    #[serde(default = "default_min_history")]
    pub min_history: usize,

    pub html_output: Option<PathBuf>,
}

fn default_exit_column() -> String {
    "phase2".to_string()
}

fn default_min_history() -> usize {
    30
}
