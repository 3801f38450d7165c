//! Look-ahead contamination tests for every feature.
//!
//! No feature value at row t may depend on data from row t+1 or later.
//!
//! Method: compute on a truncated series (rows 0..100) and on the full
//! series (rows 0..200). Rows 0..100 must be identical between both runs.

use chrono::NaiveDate;
use proptest::prelude::*;
use stockprep_core::domain::PricePoint;
use stockprep_core::features::*;

/// N points of deterministic pseudo-random OHLCV data.
fn make_test_points(n: usize) -> Vec<PricePoint> {
    let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let mut price = 100.0;

    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            let change = ((seed % 200) as f64 - 100.0) * 0.05;
            price = (price + change).max(10.0);

            let open = price - 0.5;
            let close = price + 0.3;
            PricePoint {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 2.0,
                low: open.min(close) - 2.0,
                close,
                volume: 1000 + (i as u64 * 100),
            }
        })
        .collect()
}

fn assert_no_lookahead(feature: &dyn Feature, full: &[PricePoint], truncated_len: usize) {
    let full_result = feature.compute(full);
    let truncated_result = feature.compute(&full[..truncated_len]);

    assert_eq!(truncated_result.len(), truncated_len, "{}: length", feature.name());
    assert_eq!(full_result.len(), full.len(), "{}: length", feature.name());

    for i in 0..truncated_len {
        let t = truncated_result[i];
        let f = full_result[i];
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            !t.is_nan() && !f.is_nan(),
            "{}: NaN mismatch at row {i} (truncated={t}, full={f})",
            feature.name()
        );
        assert!(
            (t - f).abs() < 1e-10,
            "{}: look-ahead at row {i}: truncated={t}, full={f}",
            feature.name()
        );
    }
}

fn all_features() -> Vec<Box<dyn Feature>> {
    vec![
        Box::new(Sma::new(20).unwrap()),
        Box::new(Ema::new(20).unwrap()),
        Box::new(Rsi::new(14).unwrap()),
        Box::new(Macd::new(12, 26).unwrap()),
        Box::new(Returns::new()),
        Box::new(Sma::new(1).unwrap()),
        Box::new(Rsi::new(2).unwrap()),
    ]
}

#[test]
fn no_feature_looks_ahead() {
    let points = make_test_points(200);
    for feature in all_features() {
        assert_no_lookahead(feature.as_ref(), &points, 100);
    }
}

#[test]
fn warmup_matches_lookback() {
    let points = make_test_points(200);
    for feature in all_features() {
        let values = feature.compute(&points);
        let lookback = feature.lookback();
        assert!(
            values[..lookback].iter().all(|v| v.is_nan()),
            "{}: defined before lookback {lookback}",
            feature.name()
        );
        assert!(
            values[lookback..].iter().all(|v| v.is_finite()),
            "{}: undefined after lookback {lookback}",
            feature.name()
        );
    }
}

#[test]
fn feature_set_frame_is_prefix_stable() {
    let points = make_test_points(150);
    let set = FeatureSet::from_params(&FeatureParams::default()).unwrap();
    let full = set.compute(&points);
    let short = set.compute(&points[..60]);

    for (name, column) in short.columns() {
        let full_column = full.column(name).unwrap();
        for (i, (a, b)) in column.iter().zip(full_column).enumerate() {
            assert!(
                (a.is_nan() && b.is_nan()) || (a - b).abs() < 1e-10,
                "{name}: row {i} differs ({a} vs {b})"
            );
        }
    }
}

proptest! {
    /// Truncating anywhere leaves every earlier value unchanged.
    #[test]
    fn truncation_never_changes_history(n in 30usize..120, cut in 1usize..30) {
        let points = make_test_points(n);
        let cut = n - cut;
        for feature in all_features() {
            let full = feature.compute(&points);
            let part = feature.compute(&points[..cut]);
            for i in 0..cut {
                prop_assert!(
                    (full[i].is_nan() && part[i].is_nan()) || (full[i] - part[i]).abs() < 1e-10,
                    "{} differs at {}", feature.name(), i
                );
            }
        }
    }
}
