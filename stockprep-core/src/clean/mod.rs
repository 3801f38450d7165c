//! Cleaning: turn raw source records into a validated `PricePoint` series.
//!
//! Stage order:
//! 1. window filter
//! 2. stable sort by date, duplicate dates removed (first occurrence wins)
//! 3. non-positive prices and negative volumes become missing
//! 4. optional split/dividend adjustment (`adj_close / close` applied to OHLC,
//!    the last known ratio carried over rows that lack one)
//! 5. missing values forward-filled per column (or incomplete rows dropped)
//! 6. leading rows that could not be filled are dropped
//! 7. rows violating the OHLC ordering are rejected
//!
//! The output is strictly increasing by date and every point is sane.

mod report;

pub use report::CleaningReport;

use crate::domain::{DateWindow, PricePoint, RawPoint};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("no rows left for '{symbol}' after cleaning ({input_rows} input rows)")]
    Empty { symbol: String, input_rows: usize },

    #[error("series invariant violated at {date}: {reason}")]
    Invariant {
        date: chrono::NaiveDate,
        reason: String,
    },
}

/// How missing values are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Carry the last observed value forward, per column.
    #[default]
    Forward,
    /// Drop any row with a missing value.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanOptions {
    /// Scale OHLC by `adj_close / close` where both are present.
    pub adjust: bool,
    pub fill: FillPolicy,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            adjust: true,
            fill: FillPolicy::Forward,
        }
    }
}

/// Cleaned series plus what was done to produce it.
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub points: Vec<PricePoint>,
    pub report: CleaningReport,
}

#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    options: CleanOptions,
}

impl Cleaner {
    pub fn new(options: CleanOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> CleanOptions {
        self.options
    }

    pub fn clean(
        &self,
        symbol: &str,
        raw: Vec<RawPoint>,
        window: Option<DateWindow>,
    ) -> Result<Cleaned, CleanError> {
        let mut report = CleaningReport {
            input_rows: raw.len(),
            ..Default::default()
        };

        let mut rows: Vec<RawPoint> = match window {
            Some(w) => raw.into_iter().filter(|p| w.contains(p.date)).collect(),
            None => raw,
        };
        report.out_of_window = report.input_rows - rows.len();

        rows.sort_by_key(|p| p.date);
        let before = rows.len();
        rows.dedup_by_key(|p| p.date);
        report.duplicates_removed = before - rows.len();

        for row in &mut rows {
            report.invalid_values += invalidate(row);
        }

        if self.options.adjust {
            let mut last_ratio = None;
            for row in &mut rows {
                if adjust(row, &mut last_ratio) {
                    report.adjusted_rows += 1;
                }
            }
        }

        match self.options.fill {
            FillPolicy::Forward => report.filled_values = forward_fill(&mut rows),
            FillPolicy::Drop => {
                let before = rows.len();
                rows.retain(RawPoint::is_complete);
                report.incomplete_dropped = before - rows.len();
            }
        }

        // After a forward fill only a leading run can still be incomplete.
        let leading = rows.iter().take_while(|p| !p.is_complete()).count();
        rows.drain(..leading);
        report.leading_dropped = leading;

        let mut points = Vec::with_capacity(rows.len());
        for row in &rows {
            match to_point(row) {
                Some(p) if p.is_sane() => points.push(p),
                _ => {
                    tracing::debug!(symbol, date = %row.date, "rejecting row that violates OHLC ordering");
                    report.rejected_rows += 1;
                }
            }
        }

        report.zero_volume_rows = points.iter().filter(|p| p.volume == 0).count();
        report.output_rows = points.len();

        if points.is_empty() {
            return Err(CleanError::Empty {
                symbol: symbol.to_string(),
                input_rows: report.input_rows,
            });
        }

        if report.rows_removed() > 0 {
            tracing::info!(
                symbol,
                input = report.input_rows,
                output = report.output_rows,
                duplicates = report.duplicates_removed,
                rejected = report.rejected_rows,
                "cleaning removed rows"
            );
        }

        Ok(Cleaned { points, report })
    }
}

/// Replace non-positive / non-finite prices and negative volumes with `None`.
/// Returns how many values were replaced.
fn invalidate(row: &mut RawPoint) -> usize {
    let mut replaced = 0;
    for price in [
        &mut row.open,
        &mut row.high,
        &mut row.low,
        &mut row.close,
        &mut row.adj_close,
    ] {
        if price.is_some_and(|v| !v.is_finite() || v <= 0.0) {
            *price = None;
            replaced += 1;
        }
    }
    if row.volume.is_some_and(|v| !v.is_finite() || v < 0.0) {
        row.volume = None;
        replaced += 1;
    }
    replaced
}

/// Apply the adjusted-close ratio to OHLC. Returns true if the row changed.
///
/// A row missing `close` or `adj_close` reuses the previous row's ratio, so
/// its remaining prices and any value forward-filled into it share a scale.
fn adjust(row: &mut RawPoint, last_ratio: &mut Option<f64>) -> bool {
    if let (Some(close), Some(adj)) = (row.close, row.adj_close) {
        *last_ratio = Some(adj / close);
    }
    let Some(ratio) = *last_ratio else {
        return false;
    };
    if (ratio - 1.0).abs() < f64::EPSILON {
        return false;
    }
    for price in [&mut row.open, &mut row.high, &mut row.low, &mut row.close] {
        if let Some(v) = price.as_mut() {
            *v *= ratio;
        }
    }
    true
}

/// Per-column forward fill. Returns the number of values filled.
fn forward_fill(rows: &mut [RawPoint]) -> usize {
    let mut last = RawPoint::default();
    let mut filled = 0;
    for row in rows.iter_mut() {
        for (value, prev) in [
            (&mut row.open, &mut last.open),
            (&mut row.high, &mut last.high),
            (&mut row.low, &mut last.low),
            (&mut row.close, &mut last.close),
            (&mut row.volume, &mut last.volume),
        ] {
            if let Some(v) = *value {
                *prev = Some(v);
            } else if prev.is_some() {
                *value = *prev;
                filled += 1;
            }
        }
    }
    filled
}

fn to_point(row: &RawPoint) -> Option<PricePoint> {
    Some(PricePoint {
        date: row.date,
        open: row.open?,
        high: row.high?,
        low: row.low?,
        close: row.close?,
        volume: row.volume?.round() as u64,
    })
}

/// Check the series invariants: strictly increasing dates and sane points.
pub fn validate_series(points: &[PricePoint]) -> Result<(), CleanError> {
    for (i, p) in points.iter().enumerate() {
        if !p.is_sane() {
            return Err(CleanError::Invariant {
                date: p.date,
                reason: "OHLC ordering or positivity violated".into(),
            });
        }
        if i > 0 && points[i - 1].date >= p.date {
            return Err(CleanError::Invariant {
                date: p.date,
                reason: format!("date not after previous {}", points[i - 1].date),
            });
        }
    }
    Ok(())
}
