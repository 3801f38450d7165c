//! Integration tests: raw data through cleaning and feature derivation.

use chrono::NaiveDate;
use stockprep_core::clean::{validate_series, CleanOptions, Cleaner, FillPolicy};
use stockprep_core::data::{read_points, synthetic_points, DataProvider, ParquetCache, SyntheticProvider};
use stockprep_core::data::DataSource;
use stockprep_core::domain::DateWindow;
use stockprep_core::features::{FeatureParams, FeatureSet};
use stockprep_core::CuratedDataset;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const MESSY_CSV: &str = "\
Date;Open;High;Low;Close;Volume;Adj Close
2024-01-05;101.0;103.0;100.0;102.0;1200;102.0
2024-01-02;99.0;101.0;98.0;100.0;1000;100.0
2024-01-03;100.0;102.0;99.0;101.0;1100;101.0
2024-01-03;500.0;600.0;400.0;550.0;9999;550.0
2024-01-04;;102.5;99.5;-1.0;abc;101.5
2024-01-08;102.0;104.0;101.0;103.0;0;103.0
";

#[test]
fn messy_csv_cleans_into_valid_series() {
    let parsed = read_points(MESSY_CSV.as_bytes()).unwrap();
    assert_eq!(parsed.points.len(), 6);
    assert_eq!(parsed.coerced_values, 1);

    let cleaned = Cleaner::new(CleanOptions::default())
        .clean("AAPL", parsed.points, None)
        .unwrap();
    validate_series(&cleaned.points).unwrap();

    let dates: Vec<_> = cleaned.points.iter().map(|p| p.date).collect();
    assert_eq!(
        dates,
        vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4), date(2024, 1, 5), date(2024, 1, 8)]
    );

    // Duplicate 2024-01-03: the first row wins.
    assert_eq!(cleaned.points[1].close, 101.0);

    // 2024-01-04: missing open, negative close and bad volume come from 01-03.
    let filled = cleaned.points[2];
    assert_eq!(filled.open, 100.0);
    assert_eq!(filled.close, 101.0);
    assert_eq!(filled.high, 102.5);
    assert_eq!(filled.volume, 1100);
    assert_eq!(cleaned.report.filled_values, 3);

    assert_eq!(cleaned.report.duplicates_removed, 1);
    assert_eq!(cleaned.report.invalid_values, 1);
    assert_eq!(cleaned.report.zero_volume_rows, 1);
}

#[test]
fn drop_policy_removes_incomplete_rows() {
    let parsed = read_points(MESSY_CSV.as_bytes()).unwrap();
    let opts = CleanOptions {
        adjust: false,
        fill: FillPolicy::Drop,
    };
    let cleaned = Cleaner::new(opts).clean("AAPL", parsed.points, None).unwrap();
    assert_eq!(cleaned.points.len(), 4);
    assert_eq!(cleaned.report.incomplete_dropped, 1);
    assert!(cleaned.points.iter().all(|p| p.date != date(2024, 1, 4)));
}

#[test]
fn synthetic_two_years_to_clean_dataset() {
    let window = DateWindow::from_period("2y", date(2024, 12, 31)).unwrap();
    let raw = synthetic_points("AAPL", window);
    let cleaned = Cleaner::default().clean("AAPL", raw, Some(window)).unwrap();
    assert!(cleaned.points.len() > 500);
    validate_series(&cleaned.points).unwrap();

    let set = FeatureSet::from_params(&FeatureParams::default()).unwrap();
    let dataset = CuratedDataset::build("AAPL", cleaned.points, &set);
    let clean = dataset.clean();

    assert_eq!(clean.len(), dataset.len() - set.max_lookback());
    assert_eq!(clean.features.names(), vec!["SMA_20", "EMA_20", "RSI_14", "MACD", "Return"]);
    for i in 0..clean.len() {
        let rsi = clean.features.get("RSI_14", i).unwrap();
        assert!((0.0..=100.0).contains(&rsi));
    }
}

#[test]
fn window_filter_counts_out_of_window_rows() {
    let wide = DateWindow::new(date(2024, 1, 1), date(2024, 3, 31)).unwrap();
    let narrow = DateWindow::new(date(2024, 2, 1), date(2024, 2, 29)).unwrap();
    let raw = synthetic_points("MSFT", wide);
    let total = raw.len();

    let cleaned = Cleaner::default().clean("MSFT", raw, Some(narrow)).unwrap();
    assert_eq!(cleaned.points.len(), 21);
    assert_eq!(cleaned.report.out_of_window, total - 21);
    assert!(cleaned.points.iter().all(|p| narrow.contains(p.date)));
}

#[test]
fn cache_round_trip_feeds_cleaner() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ParquetCache::new(dir.path());
    let window = DateWindow::new(date(2023, 11, 1), date(2024, 2, 29)).unwrap();

    let fetched = SyntheticProvider.fetch("AAPL", window).unwrap();
    assert_eq!(fetched.source, DataSource::Synthetic);
    cache
        .write("AAPL", &fetched.points, Some(window), fetched.source)
        .unwrap();

    let loaded = cache.load("AAPL").unwrap();
    assert_eq!(loaded, fetched.points);

    let a = Cleaner::default().clean("AAPL", loaded, Some(window)).unwrap();
    let b = Cleaner::default().clean("AAPL", fetched.points, Some(window)).unwrap();
    assert_eq!(a.points, b.points);
}
