//! Markdown summary report for a pipeline run.

use crate::pipeline::PipelineResult;
use crate::stats::ColumnStats;

/// Numbers in the report are rounded to this many decimals.
const DECIMALS: usize = 4;

pub struct MarkdownReport;

impl MarkdownReport {
    pub fn render(&self, result: &PipelineResult) -> String {
        let mut md = String::with_capacity(4096);

        md.push_str(&format!("# {} Curated Dataset Report\n\n", result.symbol));

        // Metadata
        md.push_str("| Field | Value |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!("| Symbol | {} |\n", result.symbol));
        md.push_str(&format!("| Window | {} |\n", result.window));
        md.push_str(&format!("| Source | {} |\n", result.source));
        md.push_str(&format!("| Rows (curated) | {} |\n", result.curated.len()));
        md.push_str(&format!("| Rows (clean) | {} |\n", result.clean.len()));
        md.push_str(&format!(
            "| Features | {} |\n",
            result.curated.features.names().join(", ")
        ));
        md.push_str(&format!("| Config Hash | `{}` |\n", result.config_hash));
        md.push_str(&format!("| Raw Data Hash | `{}` |\n", result.raw_hash));
        if result.is_synthetic() {
            md.push_str("| Data | **SYNTHETIC** |\n");
        }
        md.push('\n');

        self.cleaning_section(&mut md, result);
        self.stats_section(&mut md, &result.stats);
        self.outlier_section(&mut md, result);

        md.push_str("## Missing Values\n\n");
        md.push_str("Counts over the curated dataset; feature gaps are warmup rows.\n\n");
        md.push_str("| Column | Missing |\n");
        md.push_str("| --- | --- |\n");
        for (name, count) in &result.missing {
            md.push_str(&format!("| {name} | {count} |\n"));
        }
        md.push('\n');

        if !result.warnings.is_empty() {
            md.push_str("## Warnings\n\n");
            for w in &result.warnings {
                md.push_str(&format!("- {w}\n"));
            }
            md.push('\n');
        }

        md
    }

    fn cleaning_section(&self, md: &mut String, result: &PipelineResult) {
        let c = &result.cleaning;
        md.push_str("## Cleaning\n\n");
        md.push_str("| Step | Count |\n");
        md.push_str("| --- | --- |\n");
        for (label, value) in [
            ("Input rows", c.input_rows),
            ("Rows with unreadable dates", c.unparseable_rows),
            ("Outside window", c.out_of_window),
            ("Duplicate dates removed", c.duplicates_removed),
            ("Unparseable values", c.coerced_values),
            ("Negative or zero values replaced", c.invalid_values),
            ("Rows adjusted for splits/dividends", c.adjusted_rows),
            ("Values forward-filled", c.filled_values),
            ("Incomplete rows dropped", c.incomplete_dropped),
            ("Leading rows dropped", c.leading_dropped),
            ("Rows rejected (OHLC ordering)", c.rejected_rows),
            ("Output rows", c.output_rows),
        ] {
            md.push_str(&format!("| {label} | {value} |\n"));
        }
        md.push('\n');
    }

    fn stats_section(&self, md: &mut String, stats: &[ColumnStats]) {
        md.push_str("## Summary Statistics\n\n");
        if stats.is_empty() {
            md.push_str("No rows with every feature defined.\n\n");
            return;
        }

        md.push_str("| Statistic |");
        for s in stats {
            md.push_str(&format!(" {} |", s.name));
        }
        md.push('\n');
        md.push_str("| --- |");
        for _ in stats {
            md.push_str(" --- |");
        }
        md.push('\n');

        md.push_str("| count |");
        for s in stats {
            md.push_str(&format!(" {} |", s.count));
        }
        md.push('\n');

        let rows: [(&str, fn(&ColumnStats) -> f64); 7] = [
            ("mean", |s| s.mean),
            ("std", |s| s.std),
            ("min", |s| s.min),
            ("25%", |s| s.p25),
            ("50%", |s| s.median),
            ("75%", |s| s.p75),
            ("max", |s| s.max),
        ];
        for (label, pick) in rows {
            md.push_str(&format!("| {label} |"));
            for s in stats {
                md.push_str(&format!(" {} |", fmt_number(pick(s))));
            }
            md.push('\n');
        }
        md.push('\n');
    }

    fn outlier_section(&self, md: &mut String, result: &PipelineResult) {
        let pct = (result.outlier_threshold * 100.0 * 1e4).round() / 1e4;
        md.push_str(&format!("## Days with Extreme Daily Returns (>{pct}%)\n\n"));
        if result.outliers.is_empty() {
            md.push_str("None.\n\n");
            return;
        }
        md.push_str("| Date | Close | Return |\n");
        md.push_str("| --- | --- | --- |\n");
        for o in &result.outliers {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                o.date,
                fmt_number(o.close),
                fmt_number(o.ret)
            ));
        }
        md.push('\n');
    }
}

fn fmt_number(v: f64) -> String {
    if v.is_nan() {
        "-".to_string()
    } else {
        format!("{:.*}", DECIMALS, v)
    }
}
