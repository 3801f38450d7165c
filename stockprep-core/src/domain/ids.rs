use serde::{Deserialize, Serialize};
use std::fmt;

use super::PricePoint;

/// Deterministic dataset hash (BLAKE3 over the canonical point series).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn from_hash(hash: &str) -> Self {
        Self(hash.to_string())
    }

    /// Hash a symbol and its cleaned points.
    ///
    /// Covers the date and every OHLCV field, so two series hash equal only
    /// when they are bit-for-bit identical.
    pub fn of_points(symbol: &str, points: &[PricePoint]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        for p in points {
            hasher.update(p.date.to_string().as_bytes());
            hasher.update(&p.open.to_le_bytes());
            hasher.update(&p.high.to_le_bytes());
            hasher.update(&p.low.to_le_bytes());
            hasher.update(&p.close.to_le_bytes());
            hasher.update(&p.volume.to_le_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(day: u32, close: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100,
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let points = vec![point(2, 10.0), point(3, 11.0)];
        assert_eq!(
            DatasetHash::of_points("AAPL", &points),
            DatasetHash::of_points("AAPL", &points)
        );
    }

    #[test]
    fn hash_changes_with_symbol_and_values() {
        let points = vec![point(2, 10.0), point(3, 11.0)];
        let base = DatasetHash::of_points("AAPL", &points);
        assert_ne!(base, DatasetHash::of_points("MSFT", &points));

        let mut changed = points.clone();
        changed[1].close = 11.5;
        assert_ne!(base, DatasetHash::of_points("AAPL", &changed));
    }
}
