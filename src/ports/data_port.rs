//! Market-data provider port.

use crate::domain::bar::PriceSeries;
use crate::domain::error::MactraderError;
use chrono::NaiveDate;

/// Inclusive date bounds; `None` leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

pub trait DataPort {
    /// Bars for `symbol` within `range`, ascending by date.
    fn fetch_bars(&self, symbol: &str, range: DateRange) -> Result<PriceSeries, MactraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, MactraderError>;
}
