//! Pipeline runner: wires loading, cleaning, features and statistics.
//!
//! Two entry points:
//! - `run_pipeline()`: resolves the window against today. Used by the CLI.
//! - `run_pipeline_at()`: takes the reference date explicitly, for
//!   reproducible runs and tests.

use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use stockprep_core::clean::{CleanError, Cleaner, CleaningReport};
use stockprep_core::data::{DataProvider, DataSource, ParquetCache};
use stockprep_core::domain::DateWindow;
use stockprep_core::features::{FeatureError, FeatureSet};
use stockprep_core::CuratedDataset;
use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::data_loader::{load_points, LoadError, LoadOptions};
use crate::stats::{describe, find_outliers, missing_counts, ColumnStats, Outlier};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("cleaning failed: {0}")]
    Clean(#[from] CleanError),
    #[error("feature setup failed: {0}")]
    Feature(#[from] FeatureError),
}

/// Wall-clock time spent in each stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings {
    pub load_ms: u128,
    pub clean_ms: u128,
    pub features_ms: u128,
    pub stats_ms: u128,
}

/// Everything a run produced, ready for export.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub symbol: String,
    pub window: DateWindow,
    pub source: DataSource,
    pub config_hash: String,
    pub raw_hash: String,
    /// Every cleaned row, warmup cells NaN.
    pub curated: CuratedDataset,
    /// Rows where every feature is defined.
    pub clean: CuratedDataset,
    pub cleaning: CleaningReport,
    /// Summary statistics of the clean dataset.
    pub stats: Vec<ColumnStats>,
    pub outlier_threshold: f64,
    pub outliers: Vec<Outlier>,
    /// NaN count per column of the curated dataset.
    pub missing: Vec<(String, usize)>,
    pub warnings: Vec<String>,
    pub timings: StageTimings,
}

impl PipelineResult {
    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

pub fn run_pipeline(
    config: &PipelineConfig,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
) -> Result<PipelineResult, PipelineError> {
    run_pipeline_at(config, cache, provider, chrono::Local::now().date_naive())
}

/// Run the pipeline with `today` as the default end of the window.
pub fn run_pipeline_at(
    config: &PipelineConfig,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
    today: NaiveDate,
) -> Result<PipelineResult, PipelineError> {
    config.validate_at(today)?;
    let config_hash = config.config_hash()?;
    let symbol = config.dataset.symbol.trim().to_ascii_uppercase();
    let window = config.dataset.window(today)?;
    let mut timings = StageTimings::default();

    let _run = tracing::info_span!("pipeline", %symbol, %window).entered();

    let loaded = {
        let _stage = tracing::info_span!("load").entered();
        let started = Instant::now();
        let opts = LoadOptions {
            window,
            csv: config.source.csv.clone(),
            offline: config.source.offline,
            synthetic: config.source.synthetic,
            force: config.source.force,
        };
        let loaded = load_points(&symbol, cache, provider, &opts)?;
        timings.load_ms = started.elapsed().as_millis();
        tracing::info!(
            source = %loaded.source,
            rows = loaded.points.len(),
            skipped = loaded.skipped_rows,
            elapsed_ms = timings.load_ms,
            "load complete"
        );
        loaded
    };
    let source = loaded.source;
    let raw_hash = loaded.raw_hash;
    let coerced = loaded.coerced_values;
    let skipped = loaded.skipped_rows;

    let (points, cleaning) = {
        let _stage = tracing::info_span!("clean").entered();
        let started = Instant::now();
        let cleaned = Cleaner::new(config.cleaning).clean(&symbol, loaded.points, Some(window))?;
        let mut cleaning = cleaned.report;
        // Rows the source could not turn into records still count as input.
        cleaning.coerced_values += coerced;
        cleaning.unparseable_rows += skipped;
        cleaning.input_rows += skipped;
        timings.clean_ms = started.elapsed().as_millis();
        tracing::info!(
            rows = cleaning.output_rows,
            removed = cleaning.rows_removed(),
            filled = cleaning.filled_values,
            elapsed_ms = timings.clean_ms,
            "clean complete"
        );
        (cleaned.points, cleaning)
    };

    let (features, curated, clean) = {
        let _stage = tracing::info_span!("features").entered();
        let started = Instant::now();
        let features = FeatureSet::from_params(&config.features)?;
        let curated = CuratedDataset::build(symbol.clone(), points, &features);
        let clean = curated.clean();
        timings.features_ms = started.elapsed().as_millis();
        tracing::info!(
            features = ?features.names(),
            curated_rows = curated.len(),
            clean_rows = clean.len(),
            elapsed_ms = timings.features_ms,
            "features complete"
        );
        (features, curated, clean)
    };

    let threshold = config.report.outlier_threshold;
    let (stats, outliers, missing) = {
        let _stage = tracing::info_span!("stats").entered();
        let started = Instant::now();
        let stats = describe(&clean);
        let outliers = find_outliers(&clean, threshold);
        let missing = missing_counts(&curated);
        timings.stats_ms = started.elapsed().as_millis();
        tracing::info!(
            outliers = outliers.len(),
            elapsed_ms = timings.stats_ms,
            "stats complete"
        );
        (stats, outliers, missing)
    };

    let mut warnings = cleaning.warnings();
    if source == DataSource::Synthetic {
        warnings.insert(
            0,
            "dataset was generated synthetically and does not reflect real market data".into(),
        );
    }
    if clean.is_empty() {
        warnings.push(format!(
            "{} rows are fewer than the longest feature warmup ({}); the clean dataset is empty",
            curated.len(),
            features.max_lookback()
        ));
    }
    for w in &warnings {
        tracing::warn!("{w}");
    }

    Ok(PipelineResult {
        symbol,
        window,
        source,
        config_hash,
        raw_hash,
        curated,
        clean,
        cleaning,
        stats,
        outlier_threshold: threshold,
        outliers,
        missing,
        warnings,
        timings,
    })
}
