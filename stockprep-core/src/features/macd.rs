//! MACD line: EMA(fast) - EMA(slow) of close. First valid at `slow - 1`.

use super::ema::ema_of_series;
use super::{Feature, FeatureError};
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize) -> Result<Self, FeatureError> {
        if fast == 0 {
            return Err(FeatureError::ZeroPeriod { feature: "MACD" });
        }
        if fast >= slow {
            return Err(FeatureError::MacdPeriods { fast, slow });
        }
        Ok(Self { fast, slow })
    }
}

impl Feature for Macd {
    fn name(&self) -> &str {
        "MACD"
    }

    fn lookback(&self) -> usize {
        self.slow - 1
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        let fast = ema_of_series(&closes, self.fast);
        let slow = ema_of_series(&closes, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::make_points;

    #[test]
    fn macd_warmup_is_slow_period() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let result = Macd::new(12, 26).unwrap().compute(&make_points(&closes));
        assert!(result[..25].iter().all(|v| v.is_nan()));
        assert!(result[25..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn macd_positive_in_uptrend_and_zero_when_flat() {
        let rising: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let up = Macd::new(12, 26).unwrap().compute(&make_points(&rising));
        assert!(up[25..].iter().all(|&v| v > 0.0));

        let flat = Macd::new(12, 26).unwrap().compute(&make_points(&[100.0; 40]));
        assert!(flat[25..].iter().all(|&v| v.abs() < 1e-9));
    }

    #[test]
    fn macd_requires_fast_below_slow() {
        assert_eq!(
            Macd::new(26, 26).unwrap_err(),
            FeatureError::MacdPeriods { fast: 26, slow: 26 }
        );
        assert!(Macd::new(0, 26).is_err());
    }
}
