//! Backtest pipeline: prices -> signals -> positions -> ledger.
//!
//! BacktestConfig holds every parameter of a run and is validated before any
//! computation starts.

use log::info;
use rayon::prelude::*;

use super::accountant::{Accountant, CapitalConstrainedAccountant, FixedQuantityAccountant};
use super::bar::PriceSeries;
use super::error::MactraderError;
use super::execution::ExecutionTiming;
use super::ledger::Ledger;
use super::signal::{self, RandomForecast, SignalSeries, Strategy};
use super::sizing::{self, PositionSeries, SizingPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyParams {
    MovingAverageCross { short_window: usize, long_window: usize },
    RandomForecast { seed: u64, warmup: usize },
}

impl Strategy for StrategyParams {
    fn name(&self) -> String {
        match *self {
            StrategyParams::MovingAverageCross {
                short_window,
                long_window,
            } => signal::MovingAverageCross {
                short_window,
                long_window,
            }
            .name(),
            StrategyParams::RandomForecast { seed, warmup } => {
                RandomForecast { seed, warmup }.name()
            }
        }
    }

    fn generate_signals(&self, prices: &PriceSeries) -> Result<SignalSeries, MactraderError> {
        match *self {
            StrategyParams::MovingAverageCross {
                short_window,
                long_window,
            } => signal::generate(prices, short_window, long_window),
            StrategyParams::RandomForecast { seed, warmup } => {
                RandomForecast { seed, warmup }.generate_signals(prices)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub strategy: StrategyParams,
    pub initial_capital: f64,
    pub sizing: SizingPolicy,
    pub timing: ExecutionTiming,
    pub strict_orders: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            strategy: StrategyParams::MovingAverageCross {
                short_window: 100,
                long_window: 400,
            },
            initial_capital: 100_000.0,
            sizing: SizingPolicy::FixedLot(100.0),
            timing: ExecutionTiming::SameBarClose,
            strict_orders: false,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), MactraderError> {
        if let StrategyParams::MovingAverageCross {
            short_window,
            long_window,
        } = self.strategy
        {
            signal::MovingAverageCross::new(short_window, long_window)?;
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(MactraderError::NegativeCapital {
                capital: self.initial_capital,
            });
        }
        if let SizingPolicy::FixedLot(n) = self.sizing {
            if !(n.is_finite() && n > 0.0) {
                return Err(MactraderError::invalid(
                    "strategy",
                    "lot_size",
                    "lot_size must be positive",
                ));
            }
        }
        Ok(())
    }

    /// Fixed lots are accounted without a capital constraint; capital
    /// proportional sizing needs the sequential cash-constrained walk.
    pub fn accountant(&self) -> Box<dyn Accountant + Send + Sync> {
        match self.sizing {
            SizingPolicy::FixedLot(_) => Box::new(FixedQuantityAccountant {
                initial_capital: self.initial_capital,
                timing: self.timing,
            }),
            SizingPolicy::CapitalProportional => Box::new(CapitalConstrainedAccountant {
                initial_capital: self.initial_capital,
                timing: self.timing,
                strict_orders: self.strict_orders,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub strategy_name: String,
    pub signals: SignalSeries,
    pub positions: PositionSeries,
    pub ledger: Ledger,
}

pub fn run_backtest(
    symbol: &str,
    prices: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, MactraderError> {
    config.validate()?;

    let signals = config.strategy.generate_signals(prices)?;
    let positions = sizing::size(&signals, config.sizing);
    let ledger = config.accountant().run(&positions, prices)?;

    info!(
        "{}: {} bars, {} trades, total return {:.2}%",
        symbol,
        ledger.len(),
        ledger.trades().len(),
        ledger.total_return() * 100.0
    );

    Ok(BacktestResult {
        symbol: symbol.to_string(),
        strategy_name: config.strategy.name(),
        signals,
        positions,
        ledger,
    })
}

/// Runs each symbol independently. Symbols may run in parallel; a single
/// symbol's timeline is always walked sequentially.
pub fn run_universe(
    universe: &[(String, PriceSeries)],
    config: &BacktestConfig,
    parallel: bool,
) -> Vec<(String, Result<BacktestResult, MactraderError>)> {
    let run_one = |(symbol, prices): &(String, PriceSeries)| {
        (symbol.clone(), run_backtest(symbol, prices, config))
    };

    if parallel {
        universe.par_iter().map(run_one).collect()
    } else {
        universe.iter().map(run_one).collect()
    }
}
