//! Daily simple return: close[t] / close[t-1] - 1. Undefined at index 0.

use super::Feature;
use crate::domain::PricePoint;

#[derive(Debug, Clone, Default)]
pub struct Returns;

impl Returns {
    pub fn new() -> Self {
        Self
    }
}

impl Feature for Returns {
    fn name(&self) -> &str {
        "Return"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let mut result = vec![f64::NAN; points.len()];
        for i in 1..points.len() {
            result[i] = points[i].close / points[i - 1].close - 1.0;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{assert_approx, make_points, DEFAULT_EPSILON};

    #[test]
    fn simple_returns() {
        let result = Returns.compute(&make_points(&[100.0, 110.0, 99.0]));
        assert!(result[0].is_nan());
        assert_approx(result[1], 0.10, DEFAULT_EPSILON);
        assert_approx(result[2], -0.10, DEFAULT_EPSILON);
    }

    #[test]
    fn empty_and_single_point() {
        assert!(Returns.compute(&[]).is_empty());
        assert!(Returns.compute(&make_points(&[100.0]))[0].is_nan());
    }
}
