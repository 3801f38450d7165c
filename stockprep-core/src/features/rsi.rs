//! Relative Strength Index (RSI).
//!
//! Gains and losses are the positive and negative parts of the close-to-close
//! change (the first change counts as zero). Both are Wilder-smoothed
//! (alpha = 1 / period) from the first point; the first value is reported
//! at index `period - 1`.
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), and 100 when avg_loss is zero.

use super::ema::ewm;
use super::{Feature, FeatureError};
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, FeatureError> {
        if period == 0 {
            return Err(FeatureError::ZeroPeriod { feature: "RSI" });
        }
        Ok(Self {
            period,
            name: format!("RSI_{period}"),
        })
    }
}

impl Feature for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let n = points.len();
        let mut gains = vec![0.0; n];
        let mut losses = vec![0.0; n];
        for i in 1..n {
            let change = points[i].close - points[i - 1].close;
            if change > 0.0 {
                gains[i] = change;
            } else {
                losses[i] = -change;
            }
        }

        let alpha = 1.0 / self.period as f64;
        let avg_gain = ewm(&gains, alpha, self.period);
        let avg_loss = ewm(&losses, alpha, self.period);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| {
                if g.is_nan() || l.is_nan() {
                    f64::NAN
                } else if l == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + g / l)
                }
            })
            .collect()
    }
}
