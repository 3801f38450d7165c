//! Descriptive statistics, outlier detection and missing-value counts.
//!
//! Statistics skip NaN cells. Standard deviation is the sample estimate
//! (n - 1); quantiles interpolate linearly between order statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockprep_core::CuratedDataset;

/// Name of the feature column used for outlier detection.
pub const RETURN_COLUMN: &str = "Return";

/// Base columns in export order.
pub const PRICE_COLUMNS: [&str; 5] = ["Open", "High", "Low", "Close", "Volume"];

/// Undefined statistics are NaN in memory and `null` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    #[serde(with = "nan_as_null")]
    pub mean: f64,
    #[serde(with = "nan_as_null")]
    pub std: f64,
    #[serde(with = "nan_as_null")]
    pub min: f64,
    #[serde(with = "nan_as_null")]
    pub p25: f64,
    #[serde(with = "nan_as_null")]
    pub median: f64,
    #[serde(with = "nan_as_null")]
    pub p75: f64,
    #[serde(with = "nan_as_null")]
    pub max: f64,
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        let cell = if v.is_nan() { None } else { Some(*v) };
        cell.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

/// A day whose absolute return exceeds the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlier {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(rename = "return")]
    pub ret: f64,
}

pub fn describe_column(name: &str, values: &[f64]) -> ColumnStats {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    if count == 0 {
        return ColumnStats {
            name: name.to_string(),
            count,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            p25: f64::NAN,
            median: f64::NAN,
            p75: f64::NAN,
            max: f64::NAN,
        };
    }

    let n = count as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let std = if count > 1 {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    } else {
        f64::NAN
    };

    ColumnStats {
        name: name.to_string(),
        count,
        mean,
        std,
        min: sorted[0],
        p25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.50),
        p75: quantile(&sorted, 0.75),
        max: sorted[count - 1],
    }
}

/// Linear-interpolated quantile of an ascending, NaN-free slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Price columns of a dataset by name, as `f64`.
pub fn price_column(dataset: &CuratedDataset, name: &str) -> Option<Vec<f64>> {
    let pick: fn(&stockprep_core::PricePoint) -> f64 = match name {
        "Open" => |p| p.open,
        "High" => |p| p.high,
        "Low" => |p| p.low,
        "Close" => |p| p.close,
        "Volume" => |p| p.volume as f64,
        _ => return None,
    };
    Some(dataset.points.iter().map(pick).collect())
}

/// Summary statistics for Open, High, Low, Close, Volume and Return (when derived).
pub fn describe(dataset: &CuratedDataset) -> Vec<ColumnStats> {
    let mut out: Vec<ColumnStats> = PRICE_COLUMNS
        .iter()
        .filter_map(|name| price_column(dataset, name).map(|v| describe_column(name, &v)))
        .collect();
    if let Some(returns) = dataset.features.column(RETURN_COLUMN) {
        out.push(describe_column(RETURN_COLUMN, returns));
    }
    out
}

/// Rows where |Return| is strictly above `threshold`.
///
/// When the dataset has no Return column, the daily change is derived from
/// the closes.
pub fn find_outliers(dataset: &CuratedDataset, threshold: f64) -> Vec<Outlier> {
    let returns: Vec<f64> = match dataset.features.column(RETURN_COLUMN) {
        Some(col) => col.to_vec(),
        None => std::iter::once(f64::NAN)
            .chain(dataset.points.windows(2).map(|w| w[1].close / w[0].close - 1.0))
            .take(dataset.len())
            .collect(),
    };

    dataset
        .points
        .iter()
        .zip(returns)
        .filter(|(_, r)| r.abs() > threshold)
        .map(|(p, ret)| Outlier {
            date: p.date,
            close: p.close,
            ret,
        })
        .collect()
}

/// NaN count per exported column, in export order.
pub fn missing_counts(dataset: &CuratedDataset) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = PRICE_COLUMNS
        .iter()
        .map(|name| {
            let missing = price_column(dataset, name)
                .map(|v| v.iter().filter(|x| x.is_nan()).count())
                .unwrap_or(0);
            (name.to_string(), missing)
        })
        .collect();
    for (name, values) in dataset.features.columns() {
        out.push((name.to_string(), values.iter().filter(|v| v.is_nan()).count()));
    }
    out
}
