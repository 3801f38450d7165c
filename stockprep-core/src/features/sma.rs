//! Simple Moving Average (SMA).
//!
//! Rolling mean of close over `period` points. First valid value at `period - 1`.

use super::{Feature, FeatureError};
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, FeatureError> {
        if period == 0 {
            return Err(FeatureError::ZeroPeriod { feature: "SMA" });
        }
        Ok(Self {
            period,
            name: format!("SMA_{period}"),
        })
    }
}

/// Rolling mean over an arbitrary series; NaN until the window is full.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = sum / period as f64;
    for i in period..n {
        sum += values[i] - values[i - period];
        result[i] = sum / period as f64;
    }
    result
}

impl Feature for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        sma_of_series(&closes, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{assert_approx, make_points, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let points = make_points(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let result = Sma::new(5).unwrap().compute(&points);

        assert_eq!(result.len(), 7);
        assert!(result[..4].iter().all(|v| v.is_nan()));
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
        assert_approx(result[5], 13.0, DEFAULT_EPSILON);
        assert_approx(result[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_close() {
        let points = make_points(&[100.0, 200.0, 300.0]);
        let result = Sma::new(1).unwrap().compute(&points);
        assert_eq!(result, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn sma_too_few_points() {
        let points = make_points(&[10.0, 11.0]);
        let result = Sma::new(5).unwrap().compute(&points);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn sma_name_and_lookback() {
        let sma = Sma::new(20).unwrap();
        assert_eq!(sma.name(), "SMA_20");
        assert_eq!(sma.lookback(), 19);
        assert!(Sma::new(0).is_err());
    }
}
