//! Raw record loading for the pipeline.
//!
//! Resolves one symbol's records with this fallback policy:
//! 1. An explicit CSV import file → use it (no fallback on failure)
//! 2. Cache covers the window and no forced refresh → use it
//! 3. Provider available and not offline → download and cache
//! 4. `synthetic` enabled → generate a synthetic series (tagged)
//! 5. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only mode. Artifacts produced from it carry
//! a warning.

use std::path::PathBuf;

use stockprep_core::data::{
    CoverageResult, CsvProvider, DataError, DataProvider, DataSource, FetchResult, ParquetCache,
    SyntheticProvider,
};
use stockprep_core::domain::{DateWindow, RawPoint};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to import {path}: {source}")]
    CsvImport { path: PathBuf, source: DataError },

    #[error(
        "no cached data for '{symbol}' covering {window} and no network access (use --synthetic for synthetic data)"
    )]
    NoCachedDataOffline { symbol: String, window: DateWindow },

    #[error("no cached data for '{symbol}' and download failed: {reason}")]
    DownloadFailed { symbol: String, reason: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub window: DateWindow,
    pub csv: Option<PathBuf>,
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic records when real data is unavailable.
    pub synthetic: bool,
    /// Re-download even if cached.
    pub force: bool,
}

impl LoadOptions {
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            csv: None,
            offline: false,
            synthetic: false,
            force: false,
        }
    }
}

/// Raw records plus their provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub symbol: String,
    pub points: Vec<RawPoint>,
    pub source: DataSource,
    /// Cells present in the source that could not be parsed.
    pub coerced_values: usize,
    /// Source rows dropped by the provider before they became records.
    pub skipped_rows: usize,
    /// BLAKE3 over the raw records, before cleaning.
    pub raw_hash: String,
}

impl LoadedData {
    fn new(symbol: &str, points: Vec<RawPoint>, source: DataSource) -> Self {
        let raw_hash = compute_raw_hash(symbol, &points);
        Self {
            symbol: symbol.to_string(),
            points,
            source,
            coerced_values: 0,
            skipped_rows: 0,
            raw_hash,
        }
    }

    fn fetched(symbol: &str, fetched: FetchResult, source: DataSource) -> Self {
        Self {
            coerced_values: fetched.coerced_values,
            skipped_rows: fetched.skipped_rows,
            ..Self::new(symbol, fetched.points, source)
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

/// Load raw records for one symbol over `opts.window`.
pub fn load_points(
    symbol: &str,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    let window = opts.window;

    // Step 1: explicit import
    if let Some(path) = &opts.csv {
        let fetched = CsvProvider::new(path)
            .fetch(symbol, window)
            .map_err(|source| LoadError::CsvImport {
                path: path.clone(),
                source,
            })?;
        return Ok(LoadedData::fetched(symbol, fetched, DataSource::CsvImport));
    }

    // Step 2: cache
    if !opts.force {
        match cache.covers_range(symbol, window) {
            CoverageResult::FullyCovered => match cache.load(symbol) {
                Ok(points) => {
                    tracing::info!(symbol, rows = points.len(), "loaded from cache");
                    return Ok(LoadedData::new(symbol, points, DataSource::Cache));
                }
                Err(e) => tracing::warn!(symbol, error = %e, "cache unreadable, refetching"),
            },
            CoverageResult::PartiallyCovered {
                cached_start,
                cached_end,
            } => {
                tracing::info!(symbol, %cached_start, %cached_end, %window, "cache does not cover window");
            }
            CoverageResult::NotCached => {}
        }
    }

    // Step 3: download
    let mut failure = None;
    if !opts.offline {
        if let Some(prov) = provider.filter(|p| p.is_available()) {
            match prov.fetch(symbol, window) {
                Ok(fetched) => {
                    cache.write(symbol, &fetched.points, Some(window), fetched.source)?;
                    tracing::info!(symbol, provider = prov.name(), rows = fetched.points.len(), "downloaded");
                    let source = fetched.source;
                    return Ok(LoadedData::fetched(symbol, fetched, source));
                }
                Err(e) => {
                    tracing::warn!(symbol, provider = prov.name(), error = %e, "download failed");
                    failure = Some(e.to_string());
                }
            }
        }
    }

    // Step 4: synthetic
    if opts.synthetic {
        let fetched = SyntheticProvider.fetch(symbol, window)?;
        return Ok(LoadedData::fetched(symbol, fetched, DataSource::Synthetic));
    }

    // Step 5: fail
    if opts.offline {
        return Err(LoadError::NoCachedDataOffline {
            symbol: symbol.to_string(),
            window,
        });
    }
    Err(LoadError::DownloadFailed {
        symbol: symbol.to_string(),
        reason: failure.unwrap_or_else(|| "no provider available".into()),
    })
}

/// Deterministic BLAKE3 hash over raw records. Missing values hash as a
/// distinct marker so a gap never collides with a present value.
fn compute_raw_hash(symbol: &str, points: &[RawPoint]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    for p in points {
        hasher.update(p.date.to_string().as_bytes());
        for value in [p.open, p.high, p.low, p.close, p.volume, p.adj_close] {
            match value {
                Some(v) => {
                    hasher.update(&[1]);
                    hasher.update(&v.to_le_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap()
    }

    fn sample_points() -> Vec<RawPoint> {
        (2..=5)
            .map(|d| RawPoint {
                date: date(2024, 1, d),
                open: Some(100.0),
                high: Some(102.0),
                low: Some(99.0),
                close: Some(101.0),
                volume: Some(1000.0),
                adj_close: Some(101.0),
            })
            .collect()
    }

    struct MockProvider {
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl DataProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn fetch(&self, symbol: &str, _window: DateWindow) -> Result<FetchResult, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DataError::NetworkUnreachable("mock offline".into()));
            }
            Ok(FetchResult {
                symbol: symbol.to_string(),
                points: sample_points(),
                source: DataSource::YahooFinance,
                coerced_values: 0,
                skipped_rows: 0,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn download_then_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = MockProvider::new(false);
        let opts = LoadOptions::new(window());

        let first = load_points("AAPL", &cache, Some(&provider), &opts).unwrap();
        assert_eq!(first.source, DataSource::YahooFinance);
        assert_eq!(first.points.len(), 4);

        let second = load_points("AAPL", &cache, Some(&provider), &opts).unwrap();
        assert_eq!(second.source, DataSource::Cache);
        assert_eq!(second.raw_hash, first.raw_hash);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn force_bypasses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = MockProvider::new(false);
        let mut opts = LoadOptions::new(window());

        load_points("AAPL", &cache, Some(&provider), &opts).unwrap();
        opts.force = true;
        let again = load_points("AAPL", &cache, Some(&provider), &opts).unwrap();
        assert_eq!(again.source, DataSource::YahooFinance);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn wider_window_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = MockProvider::new(false);

        load_points("AAPL", &cache, Some(&provider), &LoadOptions::new(window())).unwrap();
        let wider = DateWindow::new(date(2023, 6, 1), date(2024, 1, 31)).unwrap();
        let loaded = load_points("AAPL", &cache, Some(&provider), &LoadOptions::new(wider)).unwrap();
        assert_eq!(loaded.source, DataSource::YahooFinance);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn corrupt_cache_year_is_not_served() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let span = DateWindow::new(date(2023, 1, 1), date(2024, 6, 30)).unwrap();
        let points = stockprep_core::data::synthetic_points("AAPL", span);
        cache.write("AAPL", &points, Some(span), DataSource::YahooFinance).unwrap();
        std::fs::write(dir.path().join("symbol=AAPL/2023.parquet"), b"garbage").unwrap();

        let mut opts = LoadOptions::new(span);
        opts.offline = true;
        let err = load_points("AAPL", &cache, None, &opts).unwrap_err();
        assert!(matches!(err, LoadError::NoCachedDataOffline { .. }));

        // Online, the invalidated cache is refetched instead of served short.
        let provider = MockProvider::new(false);
        let loaded = load_points("AAPL", &cache, Some(&provider), &LoadOptions::new(span)).unwrap();
        assert_eq!(loaded.source, DataSource::YahooFinance);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn offline_without_cache_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = MockProvider::new(false);
        let mut opts = LoadOptions::new(window());
        opts.offline = true;

        let err = load_points("AAPL", &cache, Some(&provider), &opts).unwrap_err();
        assert!(matches!(err, LoadError::NoCachedDataOffline { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_download_falls_back_to_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = MockProvider::new(true);
        let mut opts = LoadOptions::new(window());

        let err = load_points("AAPL", &cache, Some(&provider), &opts).unwrap_err();
        match err {
            LoadError::DownloadFailed { reason, .. } => assert!(reason.contains("mock offline")),
            other => panic!("unexpected error: {other}"),
        }

        opts.synthetic = true;
        let loaded = load_points("AAPL", &cache, Some(&provider), &opts).unwrap();
        assert!(loaded.is_synthetic());
        assert_eq!(loaded.points.len(), 23);
    }

    #[test]
    fn csv_import_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path().join("cache"));
        let csv_path = dir.path().join("aapl.csv");
        std::fs::write(
            &csv_path,
            "Date,Open,High,Low,Close,Volume\n2024-01-02,1,2,0.5,1.5,10\nnot-a-date,1,2,0.5,1.5,10\n2024-01-03,1.5,2,1,x,11\n",
        )
        .unwrap();
        let provider = MockProvider::new(false);
        let mut opts = LoadOptions::new(window());
        opts.csv = Some(csv_path);

        let loaded = load_points("AAPL", &cache, Some(&provider), &opts).unwrap();
        assert_eq!(loaded.source, DataSource::CsvImport);
        assert_eq!(loaded.points.len(), 2);
        assert_eq!(loaded.coerced_values, 1);
        assert_eq!(loaded.skipped_rows, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_csv_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let mut opts = LoadOptions::new(window());
        opts.csv = Some(dir.path().join("missing.csv"));
        opts.synthetic = true;

        let err = load_points("AAPL", &cache, None, &opts).unwrap_err();
        assert!(matches!(err, LoadError::CsvImport { .. }));
    }

    #[test]
    fn raw_hash_distinguishes_gaps() {
        let mut points = sample_points();
        let a = compute_raw_hash("AAPL", &points);
        points[1].volume = None;
        let b = compute_raw_hash("AAPL", &points);
        assert_ne!(a, b);
        assert_ne!(a, compute_raw_hash("MSFT", &sample_points()));
    }
}
