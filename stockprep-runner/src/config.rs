//! Pipeline configuration loaded from TOML.
//!
//! Every section is optional; the defaults prepare a two-year AAPL dataset
//! exported with `;` as separator.
//!
//! ```toml
//! [dataset]
//! symbol = "AAPL"
//! period = "2y"
//!
//! [features]
//! sma = 20
//! macd_fast = 12
//! macd_slow = 26
//!
//! [export]
//! output_dir = "output"
//! separator = ";"
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockprep_core::clean::CleanOptions;
use stockprep_core::domain::{DateWindow, WindowError};
use stockprep_core::features::{FeatureParams, FeatureSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("invalid date window: {0}")]
    Window(#[from] WindowError),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dataset: DatasetConfig,
    pub source: SourceConfig,
    pub cleaning: CleanOptions,
    pub features: FeatureParams,
    pub report: ReportConfig,
    pub export: ExportConfig,
}

/// Which instrument and which dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub symbol: String,
    /// Trailing period ending at `end` (`"2y"`, `"6mo"`, `"30d"`, `"ytd"`).
    /// Ignored when `start` is set.
    pub period: String,
    pub start: Option<NaiveDate>,
    /// Defaults to today.
    pub end: Option<NaiveDate>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            symbol: "AAPL".into(),
            period: "2y".into(),
            start: None,
            end: None,
        }
    }
}

impl DatasetConfig {
    /// Resolve the requested window, with `today` standing in for a missing end date.
    pub fn window(&self, today: NaiveDate) -> Result<DateWindow, ConfigError> {
        let end = self.end.unwrap_or(today);
        let window = match self.start {
            Some(start) => DateWindow::new(start, end)?,
            None => DateWindow::from_period(&self.period, end)?,
        };
        Ok(window)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Never touch the network.
    pub offline: bool,
    /// Fall back to a generated series when nothing else is available.
    pub synthetic: bool,
    /// Import this file instead of the cache or the remote provider.
    pub csv: Option<PathBuf>,
    /// Re-download even when the cache covers the window.
    pub force: bool,
    pub cache_dir: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            offline: false,
            synthetic: false,
            csv: None,
            force: false,
            cache_dir: PathBuf::from("data/cache"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Rows with |Return| strictly above this are listed as outliers.
    pub outlier_threshold: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            outlier_threshold: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub separator: char,
    /// Also write the clean dataset as Parquet.
    pub parquet: bool,
    /// File name prefix; defaults to the lowercased symbol.
    pub file_prefix: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            separator: ';',
            parquet: false,
            file_prefix: None,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reject configurations the pipeline cannot run, resolving the window
    /// against the local date.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_at(chrono::Local::now().date_naive())
    }

    /// Like [`validate`](Self::validate), with `today` as the default window end.
    pub fn validate_at(&self, today: NaiveDate) -> Result<(), ConfigError> {
        let symbol = self.dataset.symbol.trim();
        if symbol.is_empty() || symbol.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                field: "dataset.symbol",
                reason: format!("'{}' is not a ticker symbol", self.dataset.symbol),
            });
        }

        self.dataset.window(today)?;

        FeatureSet::from_params(&self.features).map_err(|e| ConfigError::Invalid {
            field: "features",
            reason: e.to_string(),
        })?;

        let threshold = self.report.outlier_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "report.outlier_threshold",
                reason: format!("{threshold} must be a positive number"),
            });
        }

        let sep = self.export.separator;
        if !sep.is_ascii() || sep.is_ascii_alphanumeric() || matches!(sep, '"' | '\n' | '\r' | '.' | '-') {
            return Err(ConfigError::Invalid {
                field: "export.separator",
                reason: format!("{sep:?} cannot separate numeric CSV fields"),
            });
        }

        if let Some(prefix) = &self.export.file_prefix {
            if prefix.is_empty() || prefix.contains(['/', '\\']) {
                return Err(ConfigError::Invalid {
                    field: "export.file_prefix",
                    reason: format!("'{prefix}' is not a file name prefix"),
                });
            }
        }

        Ok(())
    }

    /// Prefix for exported file names.
    pub fn file_prefix(&self) -> String {
        self.export
            .file_prefix
            .clone()
            .unwrap_or_else(|| self.dataset.symbol.to_ascii_lowercase())
    }

    /// Deterministic BLAKE3 hash of the canonical JSON form.
    ///
    /// Two runs with identical configs share the same hash.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
