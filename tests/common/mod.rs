#![allow(dead_code)]

use chrono::NaiveDate;
use mactrader::domain::backtest::{BacktestConfig, StrategyParams};
use mactrader::domain::bar::{Bar, PriceSeries};
use mactrader::domain::error::MactraderError;
use mactrader::domain::sizing::SizingPolicy;
use mactrader::ports::data_port::{DataPort, DateRange};
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str, range: DateRange) -> Result<PriceSeries, MactraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(MactraderError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) => PriceSeries::new(
                bars.iter()
                    .filter(|b| range.contains(b.date))
                    .copied()
                    .collect(),
            ),
            None => Err(MactraderError::NoData {
                symbol: symbol.to_string(),
            }),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, MactraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive daily bars from 2024-01-01 with open == close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::flat(start + chrono::Duration::days(i as i64), c))
        .collect()
}

pub fn series(closes: &[f64]) -> PriceSeries {
    PriceSeries::new(bars_from_closes(closes)).unwrap()
}

/// Rises, then falls: one golden cross and one death cross for 2/4 windows.
pub fn crossover_closes() -> Vec<f64> {
    vec![5.0, 5.0, 6.0, 7.0, 8.0, 2.0, 1.0, 1.0]
}

pub fn ma_config(short_window: usize, long_window: usize, sizing: SizingPolicy) -> BacktestConfig {
    BacktestConfig {
        strategy: StrategyParams::MovingAverageCross {
            short_window,
            long_window,
        },
        initial_capital: 1000.0,
        sizing,
        ..BacktestConfig::default()
    }
}

/// Bars whose close follows a slow sine wave, enough for several crossovers.
pub fn wave_bars(count: usize, base: f64) -> Vec<Bar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| base + 10.0 * (i as f64 / 8.0).sin())
        .collect();
    bars_from_closes(&closes)
}

pub fn csv_text(bars: &[Bar]) -> String {
    let mut out = String::from("Date,Open,High,Low,Close,Volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},1000\n",
            b.date, b.open, b.close, b.close, b.close
        ));
    }
    out
}
