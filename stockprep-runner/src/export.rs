//! Artifact export: delimited CSV, Parquet, Markdown report and manifest.
//!
//! For a run with file prefix `aapl` the output directory receives:
//! - `aapl_curated_dataset.csv`: every cleaned row, warmup cells empty
//! - `aapl_curated_dataset_clean.csv`: rows with every feature defined
//! - `aapl_curated_dataset_clean.parquet`: optional
//! - `aapl_summary_report.md`
//! - `manifest.json`

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame, DataType, ParquetWriter};
use serde::{Deserialize, Serialize};
use stockprep_core::clean::CleaningReport;
use stockprep_core::domain::DateWindow;
use stockprep_core::CuratedDataset;

use crate::config::ExportConfig;
use crate::pipeline::PipelineResult;
use crate::report::MarkdownReport;
use crate::stats::{ColumnStats, Outlier, PRICE_COLUMNS};

/// Current schema version for `manifest.json`.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub curated_csv: PathBuf,
    pub clean_csv: PathBuf,
    pub clean_parquet: Option<PathBuf>,
    pub report: PathBuf,
    pub manifest: PathBuf,
}

/// Machine-readable summary of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub symbol: String,
    pub window: DateWindow,
    pub source: String,
    pub synthetic: bool,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub config_hash: String,
    pub raw_hash: String,
    pub dataset_hash: String,
    pub curated_rows: usize,
    pub clean_rows: usize,
    pub first_clean_date: Option<NaiveDate>,
    pub last_clean_date: Option<NaiveDate>,
    pub columns: Vec<String>,
    pub cleaning: CleaningReport,
    pub stats: Vec<ColumnStats>,
    pub outlier_threshold: f64,
    pub outliers: Vec<Outlier>,
    pub warnings: Vec<String>,
    pub files: Vec<String>,
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Column headers: Date, the price columns, then features in order.
pub fn dataset_columns(dataset: &CuratedDataset) -> Vec<String> {
    std::iter::once("Date")
        .chain(PRICE_COLUMNS)
        .chain(dataset.features.names())
        .map(String::from)
        .collect()
}

/// Render a dataset as delimited text. Values carry six decimals; undefined
/// feature cells are left empty.
pub fn dataset_csv(dataset: &CuratedDataset, separator: char) -> Result<String> {
    let delimiter = u8::try_from(separator)
        .with_context(|| format!("separator {separator:?} is not a single byte"))?;
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(vec![]);

    wtr.write_record(dataset_columns(dataset))?;

    let columns: Vec<&[f64]> = dataset.features.columns().map(|(_, v)| v).collect();
    for (i, p) in dataset.points.iter().enumerate() {
        let mut record = vec![
            p.date.to_string(),
            fmt_value(p.open),
            fmt_value(p.high),
            fmt_value(p.low),
            fmt_value(p.close),
            p.volume.to_string(),
        ];
        record.extend(columns.iter().map(|c| fmt_value(c[i])));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{v:.6}")
    }
}

pub fn write_dataset_csv(path: &Path, dataset: &CuratedDataset, separator: char) -> Result<()> {
    let csv = dataset_csv(dataset, separator)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Parquet ────────────────────────────────────────────────────────

pub fn write_dataset_parquet(path: &Path, dataset: &CuratedDataset) -> Result<()> {
    let epoch = NaiveDate::default();
    let dates: Vec<i32> = dataset
        .points
        .iter()
        .map(|p| (p.date - epoch).num_days() as i32)
        .collect();
    let prices = |f: fn(&stockprep_core::PricePoint) -> f64| {
        dataset.points.iter().map(f).collect::<Vec<f64>>()
    };

    let mut columns = vec![
        Column::new("Date".into(), dates)
            .cast(&DataType::Date)
            .context("failed to build Date column")?,
        Column::new("Open".into(), prices(|p| p.open)),
        Column::new("High".into(), prices(|p| p.high)),
        Column::new("Low".into(), prices(|p| p.low)),
        Column::new("Close".into(), prices(|p| p.close)),
        Column::new(
            "Volume".into(),
            dataset.points.iter().map(|p| p.volume).collect::<Vec<u64>>(),
        ),
    ];
    for (name, values) in dataset.features.columns() {
        let cells: Vec<Option<f64>> = values
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        columns.push(Column::new(name.into(), cells));
    }

    let mut df = DataFrame::new(columns).context("failed to build dataset dataframe")?;
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write every artifact for a run into `export.output_dir`.
pub fn export_dataset(
    result: &PipelineResult,
    export: &ExportConfig,
    prefix: &str,
) -> Result<ExportPaths> {
    if prefix.is_empty() {
        bail!("file prefix must not be empty");
    }
    let dir = &export.output_dir;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;

    let curated_csv = dir.join(format!("{prefix}_curated_dataset.csv"));
    write_dataset_csv(&curated_csv, &result.curated, export.separator)?;

    let clean_csv = dir.join(format!("{prefix}_curated_dataset_clean.csv"));
    write_dataset_csv(&clean_csv, &result.clean, export.separator)?;

    let clean_parquet = if export.parquet {
        let path = dir.join(format!("{prefix}_curated_dataset_clean.parquet"));
        write_dataset_parquet(&path, &result.clean)?;
        Some(path)
    } else {
        None
    };

    let report = dir.join(format!("{prefix}_summary_report.md"));
    std::fs::write(&report, MarkdownReport.render(result))
        .with_context(|| format!("failed to write {}", report.display()))?;

    let manifest = dir.join("manifest.json");
    let mut files = vec![&curated_csv, &clean_csv];
    files.extend(clean_parquet.as_ref());
    files.push(&report);
    let files = files
        .into_iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    write_manifest(&manifest, &build_manifest(result, files))?;

    tracing::info!(dir = %dir.display(), prefix, "artifacts written");

    Ok(ExportPaths {
        curated_csv,
        clean_csv,
        clean_parquet,
        report,
        manifest,
    })
}

pub fn build_manifest(result: &PipelineResult, files: Vec<String>) -> Manifest {
    Manifest {
        schema_version: SCHEMA_VERSION,
        symbol: result.symbol.clone(),
        window: result.window,
        source: result.source.to_string(),
        synthetic: result.is_synthetic(),
        generated_at: chrono::Utc::now(),
        config_hash: result.config_hash.clone(),
        raw_hash: result.raw_hash.clone(),
        dataset_hash: result.clean.hash().to_string(),
        curated_rows: result.curated.len(),
        clean_rows: result.clean.len(),
        first_clean_date: result.clean.points.first().map(|p| p.date),
        last_clean_date: result.clean.points.last().map(|p| p.date),
        columns: dataset_columns(&result.curated),
        cleaning: result.cleaning.clone(),
        stats: result.stats.clone(),
        outlier_threshold: result.outlier_threshold,
        outliers: result.outliers.clone(),
        warnings: result.warnings.clone(),
        files,
    }
}

pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest).context("failed to serialize manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write manifest to {}", path.display()))
}

/// Load a manifest, rejecting unknown schema versions.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: Manifest =
        serde_json::from_str(&json).context("failed to deserialize manifest")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}
