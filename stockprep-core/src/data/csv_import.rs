//! CSV import provider.
//!
//! Reads daily OHLCV exports (Yahoo downloads, spreadsheet dumps, earlier
//! runs of this pipeline). Headers are matched case-insensitively; the
//! delimiter (`,` or `;`) is detected from the header line. Numeric cells
//! that fail to parse become missing values and are counted, so the
//! cleaning stage can forward-fill them.

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::{DateWindow, RawPoint};
use chrono::NaiveDate;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    adj_close: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, DataError> {
        let find = |names: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase();
                names.iter().any(|n| h == *n)
            })
        };
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| DataError::CsvError(format!("missing column '{}'", names[0])))
        };

        Ok(Self {
            date: require(&["date", "datetime", "timestamp"])?,
            open: require(&["open"])?,
            high: require(&["high"])?,
            low: require(&["low"])?,
            close: require(&["close"])?,
            volume: require(&["volume"])?,
            adj_close: find(&["adj close", "adj_close", "adjclose"]),
        })
    }
}

/// Parsed CSV contents plus the number of cells that could not be coerced.
#[derive(Debug, Clone, Default)]
pub struct CsvParse {
    pub points: Vec<RawPoint>,
    pub coerced_values: usize,
    pub skipped_rows: usize,
}

/// Parse a date cell: `YYYY-MM-DD`, optionally followed by a time part
/// (`2024-01-02 00:00:00-05:00`, `2024-01-02T00:00:00Z`).
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    let day = cell.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

enum Cell {
    Value(f64),
    Missing,
    Unparseable,
}

fn parse_number(cell: &str) -> Cell {
    let cell = cell.trim();
    if cell.is_empty() {
        return Cell::Missing;
    }
    match cell.to_ascii_lowercase().as_str() {
        "nan" | "null" | "none" | "na" | "n/a" | "-" => return Cell::Missing,
        _ => {}
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Cell::Value(v),
        _ => Cell::Unparseable,
    }
}

/// Pick `;` when the header has more semicolons than commas.
fn detect_delimiter(header_line: &str) -> u8 {
    let semis = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semis > commas {
        b';'
    } else {
        b','
    }
}

/// Parse OHLCV records from any reader.
pub fn read_points<R: Read>(reader: R) -> Result<CsvParse, DataError> {
    let mut buffered = BufReader::new(reader);
    let mut header_line = String::new();
    buffered
        .read_line(&mut header_line)
        .map_err(|e| DataError::CsvError(format!("read header: {e}")))?;
    if header_line.trim().is_empty() {
        return Err(DataError::CsvError("empty file".into()));
    }
    let delimiter = detect_delimiter(&header_line);

    // Re-chain the header so the csv reader sees the complete input.
    let input = std::io::Cursor::new(header_line.into_bytes()).chain(buffered);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = rdr
        .headers()
        .map_err(|e| DataError::CsvError(format!("header: {e}")))?
        .clone();
    let cols = Columns::resolve(&headers)?;

    let mut parse = CsvParse::default();
    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| DataError::CsvError(format!("row {}: {e}", line + 2)))?;

        let Some(date) = record.get(cols.date).and_then(parse_date) else {
            tracing::warn!(row = line + 2, "skipping CSV row with unparseable date");
            parse.skipped_rows += 1;
            continue;
        };

        let mut number = |idx: Option<usize>| match idx.and_then(|i| record.get(i)).map(parse_number) {
            Some(Cell::Value(v)) => Some(v),
            Some(Cell::Unparseable) => {
                parse.coerced_values += 1;
                None
            }
            Some(Cell::Missing) | None => None,
        };

        let point = RawPoint {
            date,
            open: number(Some(cols.open)),
            high: number(Some(cols.high)),
            low: number(Some(cols.low)),
            close: number(Some(cols.close)),
            volume: number(Some(cols.volume)),
            adj_close: number(cols.adj_close),
        };
        parse.points.push(point);
    }

    Ok(parse)
}

/// Provider that serves one symbol from a local CSV file.
pub struct CsvProvider {
    path: PathBuf,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(&self, symbol: &str, window: DateWindow) -> Result<FetchResult, DataError> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            DataError::CsvError(format!("open {}: {e}", self.path.display()))
        })?;
        let parse = read_points(file)?;
        if parse.points.is_empty() {
            return Err(DataError::CsvError(format!(
                "{} contains no data rows",
                self.path.display()
            )));
        }

        let in_window = parse.points.iter().filter(|p| window.contains(p.date)).count();
        tracing::info!(
            symbol,
            path = %self.path.display(),
            rows = parse.points.len(),
            in_window,
            coerced = parse.coerced_values,
            skipped = parse.skipped_rows,
            "imported CSV"
        );

        Ok(FetchResult {
            symbol: symbol.to_string(),
            points: parse.points,
            source: DataSource::CsvImport,
            coerced_values: parse.coerced_values,
            skipped_rows: parse.skipped_rows,
        })
    }

    fn is_available(&self) -> bool {
        self.path.is_file()
    }
}
