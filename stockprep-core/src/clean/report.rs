use serde::{Deserialize, Serialize};

/// What the cleaning stage did, row by row and value by value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    /// Source rows skipped before cleaning because their date was unreadable.
    #[serde(default)]
    pub unparseable_rows: usize,
    pub out_of_window: usize,
    pub duplicates_removed: usize,
    /// Cells present in the source that could not be parsed as numbers.
    pub coerced_values: usize,
    /// Non-positive prices and negative volumes replaced by missing.
    pub invalid_values: usize,
    pub adjusted_rows: usize,
    pub filled_values: usize,
    pub incomplete_dropped: usize,
    pub leading_dropped: usize,
    pub rejected_rows: usize,
    pub output_rows: usize,
    pub zero_volume_rows: usize,
}

impl CleaningReport {
    /// Rows removed for any reason other than falling outside the window.
    pub fn rows_removed(&self) -> usize {
        self.unparseable_rows
            + self.duplicates_removed
            + self.incomplete_dropped
            + self.leading_dropped
            + self.rejected_rows
    }

    /// Human-readable data quality warnings.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.unparseable_rows > 0 {
            out.push(format!(
                "{} source row(s) skipped because the date could not be parsed",
                self.unparseable_rows
            ));
        }
        if self.coerced_values > 0 {
            out.push(format!(
                "{} source value(s) could not be parsed and were treated as missing",
                self.coerced_values
            ));
        }
        if self.invalid_values > 0 {
            out.push(format!(
                "{} negative or zero value(s) replaced before filling",
                self.invalid_values
            ));
        }
        if self.rejected_rows > 0 {
            out.push(format!(
                "{} row(s) rejected for violating high >= max(open, close) >= min(open, close) >= low",
                self.rejected_rows
            ));
        }
        if self.zero_volume_rows > 0 {
            out.push(format!("{} row(s) with zero volume", self.zero_volume_rows));
        }
        out
    }
}
