//! Price bars and the ordered price series every pipeline stage reads.

use chrono::NaiveDate;

use super::error::MactraderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, close: f64) -> Self {
        Bar { date, open, close }
    }

    /// A bar with the same open and close, handy for close-only data.
    pub fn flat(date: NaiveDate, price: f64) -> Self {
        Bar {
            date,
            open: price,
            close: price,
        }
    }
}

/// Bars strictly ascending by date. Missing prices are carried as NaN and
/// only rejected where something has to be executed or valued against them.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, MactraderError> {
        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(MactraderError::UnorderedBars {
                    index: index + 1,
                    date: pair[1].date,
                    previous: pair[0].date,
                });
            }
        }
        Ok(PriceSeries { bars })
    }

    /// Sorts by date first. Duplicate dates are still rejected.
    pub fn from_unsorted(mut bars: Vec<Bar>) -> Result<Self, MactraderError> {
        bars.sort_by_key(|b| b.date);
        Self::new(bars)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}
