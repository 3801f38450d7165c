//! Deterministic synthetic price series for offline development.
//!
//! A random walk from 100.0, seeded by the BLAKE3 hash of the symbol so the
//! same symbol and window always produce the same series. Weekends are
//! skipped. Anything derived from this data is tagged as synthetic.

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::{DateWindow, RawPoint};
use chrono::{Datelike, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn synthetic_points(symbol: &str, window: DateWindow) -> Vec<RawPoint> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut points = Vec::new();
    let mut price = 100.0_f64;
    let mut current = window.start;

    while current <= window.end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(20_000_000..120_000_000u64);

        points.push(RawPoint {
            date: current,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume as f64),
            adj_close: Some(close),
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    points
}

/// Provider wrapper around [`synthetic_points`].
pub struct SyntheticProvider;

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, symbol: &str, window: DateWindow) -> Result<FetchResult, DataError> {
        tracing::warn!(symbol, "generating synthetic data; results will be tagged as synthetic");
        let points = synthetic_points(symbol, window);
        if points.is_empty() {
            return Err(DataError::Other(format!(
                "window {window} contains no weekdays"
            )));
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            points,
            source: DataSource::Synthetic,
            coerced_values: 0,
            skipped_rows: 0,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
