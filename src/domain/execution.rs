//! Execution timing: which price a bar's order fills at.

use std::fmt;
use std::str::FromStr;

use super::bar::PriceSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionTiming {
    /// Fill at the close of the bar that produced the order.
    #[default]
    SameBarClose,
    /// Fill at the open of the following bar.
    NextBarOpen,
}

impl ExecutionTiming {
    /// Reference price per bar, aligned with `prices`.
    ///
    /// Under `NextBarOpen`, `price[t] = open[t+1]`; the final bar has no next
    /// open and is marked at its own close.
    pub fn reference_prices(self, prices: &PriceSeries) -> Vec<f64> {
        let bars = prices.bars();
        match self {
            ExecutionTiming::SameBarClose => bars.iter().map(|b| b.close).collect(),
            ExecutionTiming::NextBarOpen => bars
                .iter()
                .enumerate()
                .map(|(i, bar)| bars.get(i + 1).map_or(bar.close, |next| next.open))
                .collect(),
        }
    }
}

impl fmt::Display for ExecutionTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionTiming::SameBarClose => write!(f, "close"),
            ExecutionTiming::NextBarOpen => write!(f, "next_open"),
        }
    }
}

impl FromStr for ExecutionTiming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "close" | "same_bar_close" => Ok(ExecutionTiming::SameBarClose),
            "next_open" | "next_bar_open" => Ok(ExecutionTiming::NextBarOpen),
            other => Err(format!(
                "unknown execution timing '{other}' (expected close or next_open)"
            )),
        }
    }
}

/// A price an order can be filled at: finite and strictly positive.
pub fn is_executable(price: f64) -> bool {
    price.is_finite() && price > 0.0
}
