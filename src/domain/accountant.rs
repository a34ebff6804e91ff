//! Portfolio accounting: turns a position series into a ledger.
//!
//! Two variants:
//! - [`FixedQuantityAccountant`] holds whatever the sizer dictated and pays
//!   for every change in holdings out of an unconstrained cash balance
//!   (borrowing for purchases and short sales is unlimited).
//! - [`CapitalConstrainedAccountant`] is a long-only, fully funded state
//!   machine: a buy spends all cash on whole shares, a sell liquidates.

use chrono::NaiveDate;
use log::{debug, info};

use super::bar::PriceSeries;
use super::error::MactraderError;
use super::execution::{is_executable, ExecutionTiming};
use super::ledger::{AccountState, Ledger};
use super::sizing::PositionSeries;

/// Capability shared by both accounting variants.
pub trait Accountant {
    fn run(&self, positions: &PositionSeries, prices: &PriceSeries)
        -> Result<Ledger, MactraderError>;
}

fn check_inputs(
    initial_capital: f64,
    positions: &PositionSeries,
    prices: &PriceSeries,
) -> Result<(), MactraderError> {
    if !(initial_capital.is_finite() && initial_capital > 0.0) {
        return Err(MactraderError::NegativeCapital {
            capital: initial_capital,
        });
    }
    if positions.len() != prices.len() {
        return Err(MactraderError::Data {
            reason: format!(
                "position series has {} bars but price series has {}",
                positions.len(),
                prices.len()
            ),
        });
    }
    if let Some((p, b)) = positions
        .points()
        .iter()
        .zip(prices.bars())
        .find(|(p, b)| p.date != b.date)
    {
        return Err(MactraderError::Data {
            reason: format!("position dated {} is aligned with bar dated {}", p.date, b.date),
        });
    }
    Ok(())
}

fn execution_price(date: NaiveDate, price: f64) -> Result<f64, MactraderError> {
    if is_executable(price) {
        Ok(price)
    } else {
        Err(MactraderError::PriceGap { date, price })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedQuantityAccountant {
    pub initial_capital: f64,
    pub timing: ExecutionTiming,
}

impl Accountant for FixedQuantityAccountant {
    fn run(
        &self,
        positions: &PositionSeries,
        prices: &PriceSeries,
    ) -> Result<Ledger, MactraderError> {
        check_inputs(self.initial_capital, positions, prices)?;
        let reference = self.timing.reference_prices(prices);
        let dates = prices.dates();
        let orders = positions.orders();

        let mut previous_held = 0.0;
        let mut spent = 0.0;
        let mut states = Vec::with_capacity(positions.len());

        for (i, point) in positions.points().iter().enumerate() {
            let held = point.target_quantity;
            let trade_quantity = held - previous_held;
            if trade_quantity != 0.0 || point.order != 0 {
                let price = execution_price(dates[i], reference[i])?;
                spent += trade_quantity * price;
                if trade_quantity != 0.0 {
                    debug!(
                        "{}: trade {:+} @ {:.4}, holding {}",
                        dates[i], trade_quantity, price, held
                    );
                }
            }
            states.push(AccountState {
                position: held,
                cash: self.initial_capital - spent,
                long: held != 0.0,
            });
            previous_held = held;
        }

        let ledger = Ledger::assemble(self.initial_capital, &dates, &reference, &orders, &states)?;
        info!(
            "fixed-quantity run over {} bars: final value {:.2}",
            ledger.len(),
            ledger.final_value()
        );
        Ok(ledger)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapitalConstrainedAccountant {
    pub initial_capital: f64,
    pub timing: ExecutionTiming,
    /// Reject a buy while long or a sell while flat instead of ignoring it.
    pub strict_orders: bool,
}

impl CapitalConstrainedAccountant {
    /// One bar of the FLAT/LONG state machine. Only the sign of `order`
    /// matters; a zero order carries the previous state forward unchanged.
    pub fn transition(
        &self,
        state: AccountState,
        order: i8,
        price: f64,
        date: NaiveDate,
    ) -> Result<AccountState, MactraderError> {
        if order == 0 {
            return Ok(state);
        }
        let price = execution_price(date, price)?;
        let flat = !state.long;

        match (order.signum(), flat) {
            (1, true) => {
                let mut shares = (state.cash / price).floor();
                // The quotient can round up onto the next whole share.
                if shares * price > state.cash {
                    shares -= 1.0;
                }
                debug!("{}: buy {} @ {:.4}", date, shares, price);
                Ok(AccountState {
                    position: shares,
                    cash: state.cash - shares * price,
                    long: true,
                })
            }
            (-1, false) => {
                debug!("{}: sell {} @ {:.4}", date, state.position, price);
                Ok(AccountState::flat(state.cash + state.position * price))
            }
            _ if self.strict_orders => Err(MactraderError::MalformedOrders {
                date,
                order,
                state: if flat { "flat" } else { "long" },
            }),
            _ => Ok(state),
        }
    }
}

impl Accountant for CapitalConstrainedAccountant {
    fn run(
        &self,
        positions: &PositionSeries,
        prices: &PriceSeries,
    ) -> Result<Ledger, MactraderError> {
        check_inputs(self.initial_capital, positions, prices)?;
        let reference = self.timing.reference_prices(prices);
        let dates = prices.dates();
        let orders = positions.orders();

        let start = AccountState::flat(self.initial_capital);
        let mut states = Vec::with_capacity(orders.len());
        orders
            .iter()
            .zip(&reference)
            .zip(&dates)
            .try_fold(start, |state, ((&order, &price), &date)| {
                let next = self.transition(state, order, price, date)?;
                states.push(next);
                Ok::<_, MactraderError>(next)
            })?;

        let ledger = Ledger::assemble(self.initial_capital, &dates, &reference, &orders, &states)?;
        info!(
            "capital-constrained run over {} bars: final value {:.2}",
            ledger.len(),
            ledger.final_value()
        );
        Ok(ledger)
    }
}
