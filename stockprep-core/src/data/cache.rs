//! Parquet cache with Hive-style partitioning.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/{year}.parquet` plus a `meta.json`
//! sidecar per symbol. Raw (pre-cleaning) records are cached so that a
//! change to the cleaning options never requires a re-download.
//!
//! - Writes are atomic (write to `.tmp`, rename into place)
//! - Files are validated on load; corrupt files are quarantined
//! - Missing values survive the round trip as Parquet nulls

use super::provider::{DataError, DataSource};
use crate::domain::{DateWindow, RawPoint};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const COLUMNS: [&str; 7] = ["date", "open", "high", "low", "close", "volume", "adj_close"];

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Window that was requested when the data was fetched. Used for
    /// coverage checks, since the first/last trading day rarely coincide
    /// with the requested bounds.
    pub requested: Option<DateWindow>,
    pub row_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: chrono::NaiveDateTime,
}

/// Cache status for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub meta: Option<CacheMeta>,
    pub size_bytes: u64,
}

/// How well the cache covers a requested window.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResult {
    NotCached,
    FullyCovered,
    PartiallyCovered {
        cached_start: NaiveDate,
        cached_end: NaiveDate,
    },
}

pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn year_path(&self, symbol: &str, year: i32) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{year}.parquet"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Replace the cached records for a symbol.
    ///
    /// Groups records by year and writes one Parquet file per year. Stale
    /// year files from an earlier, wider download are removed.
    pub fn write(
        &self,
        symbol: &str,
        points: &[RawPoint],
        requested: Option<DateWindow>,
        source: DataSource,
    ) -> Result<(), DataError> {
        let (first, last) = match (points.iter().map(|p| p.date).min(), points.iter().map(|p| p.date).max()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(DataError::CacheError("no records to cache".into())),
        };

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut by_year: BTreeMap<i32, Vec<&RawPoint>> = BTreeMap::new();
        for p in points {
            by_year.entry(p.date.year()).or_default().push(p);
        }

        for path in self.parquet_files(symbol)? {
            let stale = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i32>().ok())
                .is_some_and(|y| !by_year.contains_key(&y));
            if stale {
                fs::remove_file(&path)
                    .map_err(|e| DataError::CacheError(format!("remove stale partition: {e}")))?;
            }
        }

        for (year, year_points) in &by_year {
            let mut df = points_to_dataframe(year_points)?;
            let path = self.year_path(symbol, *year);
            let tmp_path = path.with_extension("parquet.tmp");

            write_parquet(&mut df, &tmp_path)?;
            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                DataError::CacheError(format!("atomic rename failed: {e}"))
            })?;
        }

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date: first,
            end_date: last,
            requested,
            row_count: points.len(),
            data_hash: blake3::hash(
                &serde_json::to_vec(points)
                    .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?,
            )
            .to_hex()
            .to_string(),
            source,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        tracing::debug!(symbol, rows = points.len(), years = by_year.len(), "cache written");
        Ok(())
    }

    fn parquet_files(&self, symbol: &str) -> Result<Vec<PathBuf>, DataError> {
        let sym_dir = self.symbol_dir(symbol);
        if !sym_dir.exists() {
            return Ok(Vec::new());
        }
        let entries =
            fs::read_dir(&sym_dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?
                .path();
            if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Load all cached records for a symbol, sorted by date ascending.
    ///
    /// A cache that no longer matches its `meta.json` (a partition was
    /// quarantined or the row count differs) is invalidated: the sidecar is
    /// removed and an error returned, so coverage checks stop reporting it.
    pub fn load(&self, symbol: &str) -> Result<Vec<RawPoint>, DataError> {
        let mut all = Vec::new();
        let mut quarantined = 0usize;

        for path in self.parquet_files(symbol)? {
            match load_and_validate_parquet(&path) {
                Ok(points) => all.extend(points),
                Err(e) => {
                    let quarantine = path.with_extension("parquet.quarantined");
                    tracing::warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                    let _ = fs::rename(&path, &quarantine);
                    quarantined += 1;
                }
            }
        }

        if quarantined > 0 {
            self.invalidate(symbol);
            return Err(DataError::CacheError(format!(
                "{quarantined} corrupt partition(s) for '{symbol}' quarantined; cache invalidated"
            )));
        }

        if let Some(meta) = self.get_meta(symbol) {
            if meta.row_count != all.len() {
                self.invalidate(symbol);
                return Err(DataError::CacheError(format!(
                    "cache for '{symbol}' holds {} rows but meta.json records {}; cache invalidated",
                    all.len(),
                    meta.row_count
                )));
            }
        }

        if all.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        all.sort_by_key(|p| p.date);
        Ok(all)
    }

    /// Drop the sidecar so the symbol reads as not cached.
    fn invalidate(&self, symbol: &str) {
        if let Err(e) = fs::remove_file(self.meta_path(symbol)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(symbol, error = %e, "failed to remove cache meta");
            }
        }
    }

    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Check if cached data for a symbol covers the requested window.
    pub fn covers_range(&self, symbol: &str, window: DateWindow) -> CoverageResult {
        match self.get_meta(symbol) {
            None => CoverageResult::NotCached,
            Some(meta) => {
                let (start, end) = match meta.requested {
                    Some(req) => (req.start.min(meta.start_date), req.end.max(meta.end_date)),
                    None => (meta.start_date, meta.end_date),
                };
                if start <= window.start && end >= window.end {
                    CoverageResult::FullyCovered
                } else {
                    CoverageResult::PartiallyCovered {
                        cached_start: meta.start_date,
                        cached_end: meta.end_date,
                    }
                }
            }
        }
    }

    /// Every cached symbol with its metadata and on-disk size, sorted by symbol.
    pub fn status(&self) -> Result<Vec<CacheStatus>, DataError> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(symbol) = name.strip_prefix("symbol=") else {
                continue;
            };
            out.push(CacheStatus {
                symbol: symbol.to_string(),
                meta: self.get_meta(symbol),
                size_bytes: dir_size(&entry.path()),
            });
        }
        out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(out)
    }
}

fn dir_size(path: &Path) -> u64 {
    fs::read_dir(path)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|e| e.metadata().ok())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn points_to_dataframe(points: &[&RawPoint]) -> Result<DataFrame, DataError> {
    let dates: Vec<i32> = points
        .iter()
        .map(|p| (p.date - epoch()).num_days() as i32)
        .collect();
    let col = |f: fn(&RawPoint) -> Option<f64>| points.iter().map(|p| f(p)).collect::<Vec<_>>();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("open".into(), col(|p| p.open)),
        Column::new("high".into(), col(|p| p.high)),
        Column::new("low".into(), col(|p| p.low)),
        Column::new("close".into(), col(|p| p.close)),
        Column::new("volume".into(), col(|p| p.volume)),
        Column::new("adj_close".into(), col(|p| p.adj_close)),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<RawPoint>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }
    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(DataError::ValidationError(format!("missing column '{name}'")));
        }
    }

    dataframe_to_points(&df)
}

fn dataframe_to_points(df: &DataFrame) -> Result<Vec<RawPoint>, DataError> {
    let column = |name: &str| {
        df.column(name)
            .map_err(|e| DataError::ParquetError(format!("column read: {e}")))
    };
    let floats = |name: &str| -> Result<Vec<Option<f64>>, DataError> {
        Ok(column(name)?
            .f64()
            .map_err(|e| DataError::ParquetError(format!("{name} column type: {e}")))?
            .into_iter()
            .collect())
    };

    let date_ca = column("date")?
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?
        .clone();
    let open = floats("open")?;
    let high = floats("high")?;
    let low = floats("low")?;
    let close = floats("close")?;
    let volume = floats("volume")?;
    let adj_close = floats("adj_close")?;

    let mut points = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        points.push(RawPoint {
            date: epoch() + chrono::Duration::days(days as i64),
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
            volume: volume[i],
            adj_close: adj_close[i],
        });
    }

    Ok(points)
}
