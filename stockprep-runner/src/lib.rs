//! stockprep runner: configuration, loading, orchestration and artifacts.
//!
//! This crate builds on `stockprep-core` to provide:
//! - TOML pipeline configuration with validation and hashing
//! - Data loading with CSV import / cache / download / synthetic fallback
//! - The end-to-end pipeline run (load, clean, derive features, summarize)
//! - Descriptive statistics, outlier detection and missing-value counts
//! - CSV, Parquet, Markdown and JSON manifest export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use config::{ConfigError, PipelineConfig};
pub use data_loader::{load_points, LoadError, LoadOptions, LoadedData};
pub use export::{export_dataset, load_manifest, ExportPaths, Manifest};
pub use pipeline::{run_pipeline, run_pipeline_at, PipelineError, PipelineResult};
pub use report::MarkdownReport;
pub use stats::{describe, find_outliers, missing_counts, ColumnStats, Outlier};
