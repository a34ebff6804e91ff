//! The per-bar ledger: holdings, cash, total value and return.

use chrono::NaiveDate;
use std::fmt;

use super::error::MactraderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    /// Price the bar's order executes at and holdings are valued at.
    pub reference_price: f64,
    pub order: i8,
    pub held_quantity: f64,
    pub cash: f64,
    pub holdings_value: f64,
    pub total_value: f64,
    pub period_return: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// An executed change in holdings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
}

impl Trade {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

/// Running account after a bar: shares held and cash on hand.
///
/// `long` is the side the last accepted order moved the account to. It can
/// be set with no shares held, when a buy could not afford a single share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountState {
    pub position: f64,
    pub cash: f64,
    pub long: bool,
}

impl AccountState {
    pub fn flat(cash: f64) -> Self {
        AccountState {
            position: 0.0,
            cash,
            long: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    initial_capital: f64,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Values each bar's account state and chains period returns.
    ///
    /// Holdings are worth exactly 0 when flat; a held position on a bar with
    /// no usable price is a `PriceGap`.
    pub(crate) fn assemble(
        initial_capital: f64,
        dates: &[NaiveDate],
        prices: &[f64],
        orders: &[i8],
        states: &[AccountState],
    ) -> Result<Self, MactraderError> {
        let mut entries: Vec<LedgerEntry> = Vec::with_capacity(states.len());

        for (i, state) in states.iter().enumerate() {
            let price = prices[i];
            let holdings_value = if state.position == 0.0 {
                0.0
            } else if price.is_finite() {
                state.position * price
            } else {
                return Err(MactraderError::PriceGap {
                    date: dates[i],
                    price,
                });
            };
            let total_value = state.cash + holdings_value;
            let period_return = match entries.last() {
                Some(prev) if prev.total_value != 0.0 => total_value / prev.total_value - 1.0,
                _ => 0.0,
            };

            entries.push(LedgerEntry {
                date: dates[i],
                reference_price: price,
                order: orders[i],
                held_quantity: state.position,
                cash: state.cash,
                holdings_value,
                total_value,
                period_return,
            });
        }

        Ok(Ledger {
            initial_capital,
            entries,
        })
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn head(&self, n: usize) -> &[LedgerEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn tail(&self, n: usize) -> &[LedgerEntry] {
        &self.entries[self.entries.len().saturating_sub(n)..]
    }

    pub fn last(&self) -> Option<&LedgerEntry> {
        self.entries.last()
    }

    pub fn totals(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.total_value).collect()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.period_return).collect()
    }

    pub fn final_value(&self) -> f64 {
        self.last().map_or(self.initial_capital, |e| e.total_value)
    }

    /// Final value relative to starting capital, e.g. 0.05 for +5%.
    pub fn total_return(&self) -> f64 {
        self.final_value() / self.initial_capital - 1.0
    }

    /// Every bar on which the held quantity changed.
    pub fn trades(&self) -> Vec<Trade> {
        let mut previous = 0.0;
        let mut trades = Vec::new();
        for entry in &self.entries {
            let delta = entry.held_quantity - previous;
            if delta != 0.0 {
                trades.push(Trade {
                    date: entry.date,
                    side: if delta > 0.0 { Side::Buy } else { Side::Sell },
                    quantity: delta.abs(),
                    price: entry.reference_price,
                });
            }
            previous = entry.held_quantity;
        }
        trades
    }
}
