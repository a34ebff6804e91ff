//! CSV file data adapter.
//!
//! One file per symbol, `<SYMBOL>.csv`, with a header row. Columns are found
//! by name (case-insensitive `date`, `open`, `close`), so provider downloads
//! with extra columns such as `High` or `Adj Close` load as they are. Empty
//! or `null` prices load as missing.

use crate::domain::bar::{Bar, PriceSeries};
use crate::domain::error::MactraderError;
use crate::ports::data_port::{DataPort, DateRange};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Parses CSV text into bars within `range`.
    pub fn parse(content: &str, range: DateRange) -> Result<PriceSeries, MactraderError> {
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| MactraderError::Data {
                reason: format!("CSV header error: {}", e),
            })?
            .clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| MactraderError::Data {
                    reason: format!("missing {} column", name),
                })
        };
        let date_col = column("date")?;
        let open_col = column("open")?;
        let close_col = column("close")?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| MactraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(date_col).unwrap_or_default().trim();
            let date = parse_bar_date(date_str)?;
            if !range.contains(date) {
                continue;
            }

            let open = parse_price(record.get(open_col), "open")?;
            let close = parse_price(record.get(close_col), "close")?;
            bars.push(Bar::new(date, open, close));
        }

        PriceSeries::from_unsorted(bars)
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time of day.
fn parse_bar_date(value: &str) -> Result<NaiveDate, MactraderError> {
    let day = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| MactraderError::Data {
        reason: format!("invalid date '{}': {}", value, e),
    })
}

fn parse_price(value: Option<&str>, column: &str) -> Result<f64, MactraderError> {
    match value.map(str::trim) {
        None | Some("") => Ok(f64::NAN),
        Some(v) if v.eq_ignore_ascii_case("null") || v.eq_ignore_ascii_case("nan") => Ok(f64::NAN),
        Some(v) => v.parse().map_err(|e| MactraderError::Data {
            reason: format!("invalid {} value '{}': {}", column, v, e),
        }),
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str, range: DateRange) -> Result<PriceSeries, MactraderError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(MactraderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| MactraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::parse(&content, range)
    }

    fn list_symbols(&self) -> Result<Vec<String>, MactraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| MactraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MactraderError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
