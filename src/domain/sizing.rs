//! Position sizing: maps signals to a target holding per bar.

use chrono::NaiveDate;
use std::fmt;

use super::signal::SignalSeries;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingPolicy {
    /// Hold `n * signal` shares.
    FixedLot(f64),
    /// Spend all available cash on whole shares. Sized by the accountant,
    /// since the share count depends on cash at execution time.
    CapitalProportional,
}

impl fmt::Display for SizingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizingPolicy::FixedLot(n) => write!(f, "fixed lot of {}", n),
            SizingPolicy::CapitalProportional => write!(f, "capital proportional"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionPoint {
    pub date: NaiveDate,
    pub signal: i8,
    pub order: i8,
    /// Shares to hold after this bar. Under `CapitalProportional` this is
    /// only the direction (the signal itself).
    pub target_quantity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSeries {
    pub policy: SizingPolicy,
    points: Vec<PositionPoint>,
}

impl PositionSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PositionPoint] {
        &self.points
    }

    pub fn target_quantities(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.target_quantity).collect()
    }

    pub fn orders(&self) -> Vec<i8> {
        self.points.iter().map(|p| p.order).collect()
    }
}

pub fn size(signals: &SignalSeries, policy: SizingPolicy) -> PositionSeries {
    let points = signals
        .points()
        .iter()
        .map(|p| {
            let target_quantity = match policy {
                SizingPolicy::FixedLot(n) => n * f64::from(p.signal),
                SizingPolicy::CapitalProportional => f64::from(p.signal),
            };
            PositionPoint {
                date: p.date,
                signal: p.signal,
                order: p.order,
                target_quantity,
            }
        })
        .collect();
    PositionSeries { policy, points }
}
