//! Symbol universe for multi-symbol backtests.
//!
//! Parses symbol lists from configuration and loads a price series for each
//! symbol, skipping the ones the provider has nothing for.

use crate::domain::bar::PriceSeries;
use crate::domain::error::MactraderError;
use crate::ports::data_port::{DataPort, DateRange};
use log::warn;
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct LoadedUniverse {
    pub series: Vec<(String, PriceSeries)>,
    pub skipped: Vec<SkippedSymbol>,
}

impl LoadedUniverse {
    pub fn count(&self) -> usize {
        self.series.len()
    }
}

/// Fetches every symbol once, up front. Fails only if nothing loads.
pub fn load_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
    range: DateRange,
) -> Result<LoadedUniverse, MactraderError> {
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        match data_port.fetch_bars(symbol, range) {
            Ok(bars) if bars.is_empty() => {
                warn!("skipping {} (no data in range)", symbol);
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::NoData,
                });
            }
            Ok(bars) => series.push((symbol.clone(), bars)),
            Err(e) => {
                warn!("skipping {} ({})", symbol, e);
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::Failed(e.to_string()),
                });
            }
        }
    }

    if series.is_empty() {
        return Err(MactraderError::InsufficientData {
            bars: 0,
            minimum: 1,
        });
    }

    Ok(LoadedUniverse { series, skipped })
}
