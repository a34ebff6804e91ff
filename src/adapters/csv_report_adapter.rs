//! Ledger CSV report adapter implementing ReportPort.
//!
//! One row per bar: the signal that drove it alongside the accounting
//! columns, in a shape spreadsheet and dataframe tools read directly.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MactraderError;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Serialize)]
struct LedgerRow {
    date: String,
    price: f64,
    signal: i8,
    order: i8,
    short_mavg: Option<f64>,
    long_mavg: Option<f64>,
    held_quantity: f64,
    cash: f64,
    holdings: f64,
    total: f64,
    returns: f64,
}

fn rows(result: &BacktestResult) -> Vec<LedgerRow> {
    let short = result.signals.short_mavg();
    let long = result.signals.long_mavg();

    result
        .ledger
        .entries()
        .iter()
        .zip(result.signals.points())
        .enumerate()
        .map(|(i, (entry, point))| LedgerRow {
            date: entry.date.format("%Y-%m-%d").to_string(),
            price: entry.reference_price,
            signal: point.signal,
            order: point.order,
            short_mavg: short.map(|s| s[i]),
            long_mavg: long.map(|l| l[i]),
            held_quantity: entry.held_quantity,
            cash: entry.cash,
            holdings: entry.holdings_value,
            total: entry.total_value,
            returns: entry.period_return,
        })
        .collect()
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    /// Writes the ledger rows to any writer.
    pub fn write_to<W: std::io::Write>(
        result: &BacktestResult,
        writer: W,
    ) -> Result<(), MactraderError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in rows(result) {
            wtr.serialize(row).map_err(|e| MactraderError::Report {
                reason: format!("failed to write ledger row: {}", e),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), MactraderError> {
        let file = File::create(output_path)?;
        Self::write_to(result, file)
    }

    fn file_name(&self, result: &BacktestResult) -> String {
        format!("{}_ledger.csv", result.symbol)
    }
}
