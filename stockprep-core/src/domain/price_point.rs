//! PricePoint is one cleaned trading day; RawPoint is one day as a source delivered it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV record after cleaning.
///
/// A series of these is strictly increasing by date, and every element
/// satisfies [`PricePoint::is_sane`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PricePoint {
    /// high >= max(open, close) >= min(open, close) >= low, all prices finite and positive.
    pub fn is_sane(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return false;
        }
        let body_top = self.open.max(self.close);
        let body_bottom = self.open.min(self.close);
        self.high >= body_top && body_bottom >= self.low
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// A daily record before validation. Absent fields are missing or unparseable upstream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawPoint {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub adj_close: Option<f64>,
}

impl RawPoint {
    /// True when no OHLCV field is present (non-trading day placeholder).
    pub fn is_empty(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.volume.is_none()
    }

    /// True when every OHLCV field is present.
    pub fn is_complete(&self) -> bool {
        self.open.is_some()
            && self.high.is_some()
            && self.low.is_some()
            && self.close.is_some()
            && self.volume.is_some()
    }
}

impl From<PricePoint> for RawPoint {
    fn from(p: PricePoint) -> Self {
        Self {
            date: p.date,
            open: Some(p.open),
            high: Some(p.high),
            low: Some(p.low),
            close: Some(p.close),
            volume: Some(p.volume as f64),
            adj_close: Some(p.close),
        }
    }
}
