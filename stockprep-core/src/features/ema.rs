//! Exponential Moving Average (EMA).
//!
//! EMA[0] = close[0]; EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1],
//! alpha = 2 / (period + 1). The recursion starts at the first point with
//! no bias correction; values before index `period - 1` are masked as NaN.

use super::{Feature, FeatureError};
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, FeatureError> {
        if period == 0 {
            return Err(FeatureError::ZeroPeriod { feature: "EMA" });
        }
        Ok(Self {
            period,
            name: format!("EMA_{period}"),
        })
    }
}

/// Recursive smoothing with factor `alpha`, seeded with the first value.
/// Values before `min_periods - 1` are NaN.
pub(crate) fn ewm(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    let mut prev = None;
    for (i, &v) in values.iter().enumerate() {
        let cur = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        prev = Some(cur);
        if i + 1 >= min_periods {
            result[i] = cur;
        }
    }
    result
}

/// EMA of an arbitrary series. Used by MACD.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }
    ewm(values, 2.0 / (period as f64 + 1.0), period)
}

impl Feature for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        ema_of_series(&closes, self.period)
    }
}
