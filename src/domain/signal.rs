//! Signal generation: strategies that turn a price series into a discrete
//! signal per bar and the derived order (first difference of the signal).

use chrono::NaiveDate;
use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::bar::PriceSeries;
use super::error::MactraderError;
use super::moving_average::{partial_count, rolling_mean};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub signal: i8,
    pub order: i8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverages {
    pub short_window: usize,
    pub long_window: usize,
    pub short: Vec<f64>,
    pub long: Vec<f64>,
}

/// Signals aligned 1:1 with the price series they were generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSeries {
    points: Vec<SignalPoint>,
    averages: Option<MovingAverages>,
}

impl SignalSeries {
    /// Builds the series from raw signals; `order[0]` is 0 and
    /// `order[t] = signal[t] - signal[t-1]` afterwards.
    pub fn from_signals(dates: &[NaiveDate], signals: &[i8]) -> Self {
        let points = dates
            .iter()
            .zip(signals)
            .enumerate()
            .map(|(i, (&date, &signal))| {
                let signal = signal.signum();
                let order = if i == 0 {
                    0
                } else {
                    signal - signals[i - 1].signum()
                };
                SignalPoint {
                    date,
                    signal,
                    order,
                }
            })
            .collect();
        SignalSeries {
            points,
            averages: None,
        }
    }

    fn with_averages(mut self, averages: MovingAverages) -> Self {
        self.averages = Some(averages);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SignalPoint] {
        &self.points
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn signals(&self) -> Vec<i8> {
        self.points.iter().map(|p| p.signal).collect()
    }

    pub fn orders(&self) -> Vec<i8> {
        self.points.iter().map(|p| p.order).collect()
    }

    pub fn averages(&self) -> Option<&MovingAverages> {
        self.averages.as_ref()
    }

    pub fn short_mavg(&self) -> Option<&[f64]> {
        self.averages.as_ref().map(|a| a.short.as_slice())
    }

    pub fn long_mavg(&self) -> Option<&[f64]> {
        self.averages.as_ref().map(|a| a.long.as_slice())
    }

    pub fn buy_dates(&self) -> Vec<NaiveDate> {
        self.points
            .iter()
            .filter(|p| p.order > 0)
            .map(|p| p.date)
            .collect()
    }

    pub fn sell_dates(&self) -> Vec<NaiveDate> {
        self.points
            .iter()
            .filter(|p| p.order < 0)
            .map(|p| p.date)
            .collect()
    }

    pub fn has_orders(&self) -> bool {
        self.points.iter().any(|p| p.order != 0)
    }
}

/// Capability shared by every signal rule.
pub trait Strategy {
    fn name(&self) -> String;

    fn generate_signals(&self, prices: &PriceSeries) -> Result<SignalSeries, MactraderError>;
}

/// Long/flat crossover of two trailing simple moving averages of the close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovingAverageCross {
    pub short_window: usize,
    pub long_window: usize,
}

impl MovingAverageCross {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, MactraderError> {
        validate_windows(short_window, long_window)?;
        Ok(MovingAverageCross {
            short_window,
            long_window,
        })
    }
}

impl Strategy for MovingAverageCross {
    fn name(&self) -> String {
        format!("MA cross ({}/{})", self.short_window, self.long_window)
    }

    fn generate_signals(&self, prices: &PriceSeries) -> Result<SignalSeries, MactraderError> {
        generate(prices, self.short_window, self.long_window)
    }
}

fn validate_windows(short_window: usize, long_window: usize) -> Result<(), MactraderError> {
    if short_window == 0 {
        return Err(MactraderError::invalid(
            "strategy",
            "short_window",
            "short_window must be positive",
        ));
    }
    if long_window == 0 {
        return Err(MactraderError::invalid(
            "strategy",
            "long_window",
            "long_window must be positive",
        ));
    }
    if short_window >= long_window {
        return Err(MactraderError::invalid(
            "strategy",
            "long_window",
            format!("long_window ({long_window}) must exceed short_window ({short_window})"),
        ));
    }
    Ok(())
}

/// Moving-average crossover signals.
///
/// `signal[t] = 1` when the short average is above the long one, else 0; the
/// first `short_window` entries are held at 0 whatever the averages say. If
/// the series is shorter than `long_window` the long average never covers a
/// full window, which weakens the signal but is not an error.
pub fn generate(
    prices: &PriceSeries,
    short_window: usize,
    long_window: usize,
) -> Result<SignalSeries, MactraderError> {
    validate_windows(short_window, long_window)?;
    if prices.is_empty() {
        return Err(MactraderError::InsufficientData {
            bars: 0,
            minimum: 1,
        });
    }

    if prices.len() < long_window {
        warn!(
            "only {} bars for a {}-bar long window; {} long averages cover a partial window",
            prices.len(),
            long_window,
            partial_count(prices.len(), long_window)
        );
    }

    let closes = prices.closes();
    let short = rolling_mean(&closes, short_window);
    let long = rolling_mean(&closes, long_window);

    let signals: Vec<i8> = short
        .iter()
        .zip(&long)
        .enumerate()
        .map(|(i, (s, l))| i8::from(i >= short_window && s > l))
        .collect();

    Ok(
        SignalSeries::from_signals(&prices.dates(), &signals).with_averages(MovingAverages {
            short_window,
            long_window,
            short,
            long,
        }),
    )
}

/// Long/short coin flip per bar, flat for the first `warmup` bars.
///
/// Seeded so repeated runs over the same input agree exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomForecast {
    pub seed: u64,
    pub warmup: usize,
}

impl Default for RandomForecast {
    fn default() -> Self {
        RandomForecast { seed: 0, warmup: 5 }
    }
}

impl Strategy for RandomForecast {
    fn name(&self) -> String {
        format!("Random forecast (seed {})", self.seed)
    }

    fn generate_signals(&self, prices: &PriceSeries) -> Result<SignalSeries, MactraderError> {
        if prices.is_empty() {
            return Err(MactraderError::InsufficientData {
                bars: 0,
                minimum: 1,
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let signals: Vec<i8> = (0..prices.len())
            .map(|i| {
                let draw: i8 = if rng.gen_bool(0.5) { 1 } else { -1 };
                if i < self.warmup { 0 } else { draw }
            })
            .collect();

        Ok(SignalSeries::from_signals(&prices.dates(), &signals))
    }
}
