//! Feature derivation.
//!
//! Every feature is a pure function from a cleaned `PricePoint` series to a
//! numeric column of the same length. Undefined cells (warmup) are
//! `f64::NAN`. A value at index t depends only on points `0..=t`.

pub mod ema;
pub mod frame;
pub mod macd;
pub mod returns;
pub mod rsi;
pub mod sma;

pub use ema::Ema;
pub use frame::FeatureFrame;
pub use macd::Macd;
pub use returns::Returns;
pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::PricePoint;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub trait Feature: Send + Sync {
    /// Column name in the exported dataset (e.g. "SMA_20").
    fn name(&self) -> &str;

    /// Index of the first defined value; everything before is NaN.
    fn lookback(&self) -> usize;

    /// Compute the full column. Output length equals `points.len()`.
    fn compute(&self, points: &[PricePoint]) -> Vec<f64>;
}

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("{feature} period must be >= 1")]
    ZeroPeriod { feature: &'static str },

    #[error("MACD fast period ({fast}) must be shorter than slow period ({slow})")]
    MacdPeriods { fast: usize, slow: usize },

    #[error("duplicate feature column '{0}'")]
    DuplicateName(String),
}

/// Which features to derive, with their parameters. `None` disables one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    pub sma: Option<usize>,
    pub ema: Option<usize>,
    pub rsi: Option<usize>,
    pub macd: bool,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub returns: bool,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            sma: Some(20),
            ema: Some(20),
            rsi: Some(14),
            macd: true,
            macd_fast: 12,
            macd_slow: 26,
            returns: true,
        }
    }
}

/// Ordered collection of features; column order follows insertion order.
#[derive(Default)]
pub struct FeatureSet {
    features: Vec<Box<dyn Feature>>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: &FeatureParams) -> Result<Self, FeatureError> {
        let mut set = Self::new();
        if let Some(p) = params.sma {
            set.push(Box::new(Sma::new(p)?))?;
        }
        if let Some(p) = params.ema {
            set.push(Box::new(Ema::new(p)?))?;
        }
        if let Some(p) = params.rsi {
            set.push(Box::new(Rsi::new(p)?))?;
        }
        if params.macd {
            set.push(Box::new(Macd::new(params.macd_fast, params.macd_slow)?))?;
        }
        if params.returns {
            set.push(Box::new(Returns::new()))?;
        }
        Ok(set)
    }

    pub fn push(&mut self, feature: Box<dyn Feature>) -> Result<(), FeatureError> {
        if self.features.iter().any(|f| f.name() == feature.name()) {
            return Err(FeatureError::DuplicateName(feature.name().to_string()));
        }
        self.features.push(feature);
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name()).collect()
    }

    /// Longest warmup across the set.
    pub fn max_lookback(&self) -> usize {
        self.features.iter().map(|f| f.lookback()).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Compute every feature. Columns are computed in parallel; order is preserved.
    pub fn compute(&self, points: &[PricePoint]) -> FeatureFrame {
        let columns: Vec<(String, Vec<f64>)> = self
            .features
            .par_iter()
            .map(|f| (f.name().to_string(), f.compute(points)))
            .collect();
        FeatureFrame::from_columns(points.len(), columns)
    }
}

/// Synthetic points from closes: open = previous close, high/low = body ± 1.
#[cfg(test)]
pub fn make_points(closes: &[f64]) -> Vec<PricePoint> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PricePoint {
                date: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
