//! Historical date window.
//!
//! Periods follow the familiar market-data shorthand: `5d`, `1mo`, `6mo`,
//! `1y`, `2y`, `ytd`. The window is inclusive on both ends.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum WindowError {
    #[error("invalid period '{0}' (expected e.g. 5d, 6mo, 2y, ytd)")]
    InvalidPeriod(String),

    #[error("window start {start} is after end {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },

    #[error("period '{0}' reaches before the supported calendar")]
    OutOfRange(String),
}

/// Inclusive `[start, end]` range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window covering `period` back from `end`.
    pub fn from_period(period: &str, end: NaiveDate) -> Result<Self, WindowError> {
        let p = period.trim().to_ascii_lowercase();
        if p == "ytd" {
            let start = NaiveDate::from_ymd_opt(end.year(), 1, 1)
                .ok_or_else(|| WindowError::OutOfRange(period.to_string()))?;
            return Self::new(start, end);
        }

        let split = p
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| WindowError::InvalidPeriod(period.to_string()))?;
        let (digits, unit) = p.split_at(split);
        let n: u32 = digits
            .parse()
            .map_err(|_| WindowError::InvalidPeriod(period.to_string()))?;
        if n == 0 {
            return Err(WindowError::InvalidPeriod(period.to_string()));
        }

        let start = match unit {
            "d" => end.checked_sub_days(chrono::Days::new(n as u64)),
            "wk" | "w" => end.checked_sub_days(chrono::Days::new(n as u64 * 7)),
            "mo" => end.checked_sub_months(Months::new(n)),
            "y" => n
                .checked_mul(12)
                .and_then(|m| end.checked_sub_months(Months::new(m))),
            _ => return Err(WindowError::InvalidPeriod(period.to_string())),
        }
        .ok_or_else(|| WindowError::OutOfRange(period.to_string()))?;

        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days in the window.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
