//! End-to-end tests: config → load → clean → features → artifacts on disk.

use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt::Write as _;
use std::path::Path;
use stockprep_core::data::{synthetic_points, DataSource, ParquetCache};
use stockprep_core::domain::DateWindow;
use stockprep_runner::{export_dataset, load_manifest, run_pipeline_at, PipelineConfig};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 80 weekday rows from 2024-01-01 in Yahoo's comma format, with a
/// duplicated day, a negative close, a blank volume and a +15% spike.
fn messy_csv() -> String {
    let mut out = String::from("Date,Open,High,Low,Close,Adj Close,Volume\n");
    let mut day = date(2024, 1, 1);
    let mut close = 180.0_f64;
    let mut rows = 0;
    while rows < 80 {
        if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            day = day.succ_opt().unwrap();
            continue;
        }
        let open = close;
        close = if rows == 50 { open * 1.15 } else { open * (1.0 + ((rows % 7) as f64 - 3.0) * 0.002) };
        let high = open.max(close) + 0.5;
        let low = open.min(close) - 0.5;
        match rows {
            10 => writeln!(out, "{day},{open},{high},{low},-{close},{close},1000").unwrap(),
            20 => writeln!(out, "{day},{open},{high},{low},{close},{close},").unwrap(),
            _ => writeln!(out, "{day},{open},{high},{low},{close},{close},1000").unwrap(),
        }
        if rows == 30 {
            writeln!(out, "{day},1,1,1,1,1,1").unwrap();
        }
        rows += 1;
        day = day.succ_opt().unwrap();
    }
    out
}

fn csv_config(dir: &Path) -> PipelineConfig {
    let csv_path = dir.join("input.csv");
    std::fs::write(&csv_path, messy_csv()).unwrap();

    let mut config = PipelineConfig::default();
    config.dataset.start = Some(date(2024, 1, 1));
    config.dataset.end = Some(date(2024, 6, 30));
    config.source.csv = Some(csv_path);
    config.source.offline = true;
    config.export.output_dir = dir.join("out");
    config
}

#[test]
fn csv_import_to_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = csv_config(dir.path());
    let cache = ParquetCache::new(dir.path().join("cache"));

    let result = run_pipeline_at(&config, &cache, None, date(2024, 6, 30)).unwrap();
    assert_eq!(result.source, DataSource::CsvImport);
    assert_eq!(result.curated.len(), 80);
    assert_eq!(result.clean.len(), 80 - 25);
    assert_eq!(result.cleaning.duplicates_removed, 1);
    assert_eq!(result.cleaning.invalid_values, 1);
    assert!(result.cleaning.filled_values >= 2);
    assert_eq!(result.outliers.len(), 1);
    assert!((result.outliers[0].ret - 0.15).abs() < 1e-9);

    let paths = export_dataset(&result, &config.export, &config.file_prefix()).unwrap();
    assert!(paths.curated_csv.ends_with("aapl_curated_dataset.csv"));
    assert!(paths.clean_csv.ends_with("aapl_curated_dataset_clean.csv"));
    assert!(paths.clean_parquet.is_none());

    let curated = std::fs::read_to_string(&paths.curated_csv).unwrap();
    let mut lines = curated.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Date;Open;High;Low;Close;Volume;SMA_20;EMA_20;RSI_14;MACD;Return"
    );
    assert!(lines.next().unwrap().starts_with("2024-01-01;"));
    assert_eq!(curated.lines().count(), 81);

    let clean = std::fs::read_to_string(&paths.clean_csv).unwrap();
    assert_eq!(clean.lines().count(), 56);
    assert!(clean.lines().skip(1).all(|l| !l.contains(";;") && !l.ends_with(';')));

    let report = std::fs::read_to_string(&paths.report).unwrap();
    assert!(report.contains("## Days with Extreme Daily Returns (>10%)"));
    assert!(!report.contains("SYNTHETIC"));

    let manifest = load_manifest(&paths.manifest).unwrap();
    assert_eq!(manifest.symbol, "AAPL");
    assert_eq!(manifest.clean_rows, 55);
    assert_eq!(manifest.source, "csv_import");
    assert_eq!(manifest.files.len(), 3);
    assert_eq!(manifest.config_hash, config.config_hash().unwrap());
}

#[test]
fn parquet_export_and_custom_separator() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = csv_config(dir.path());
    config.export.parquet = true;
    config.export.separator = ',';
    config.export.file_prefix = Some("apple".into());
    let cache = ParquetCache::new(dir.path().join("cache"));

    let result = run_pipeline_at(&config, &cache, None, date(2024, 6, 30)).unwrap();
    let paths = export_dataset(&result, &config.export, &config.file_prefix()).unwrap();

    assert!(paths.clean_csv.ends_with("apple_curated_dataset_clean.csv"));
    let parquet = paths.clean_parquet.unwrap();
    assert!(parquet.exists());
    let head = std::fs::read_to_string(&paths.clean_csv).unwrap();
    assert!(head.starts_with("Date,Open,High,Low,Close,Volume,"));
}

#[test]
fn offline_run_uses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ParquetCache::new(dir.path().join("cache"));
    let window = DateWindow::new(date(2023, 1, 1), date(2023, 12, 31)).unwrap();
    cache
        .write("MSFT", &synthetic_points("MSFT", window), Some(window), DataSource::YahooFinance)
        .unwrap();

    let mut config = PipelineConfig::default();
    config.dataset.symbol = "msft".into();
    config.dataset.period = "6mo".into();
    config.dataset.end = Some(date(2023, 12, 31));
    config.source.offline = true;

    let result = run_pipeline_at(&config, &cache, None, date(2024, 6, 30)).unwrap();
    assert_eq!(result.symbol, "MSFT");
    assert_eq!(result.source, DataSource::Cache);
    assert!(result.cleaning.out_of_window > 0);
    assert!(result.curated.points.iter().all(|p| p.date >= date(2023, 6, 30)));
    assert!(!result.is_synthetic());
}
