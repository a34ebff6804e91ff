//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for mactrader.
#[derive(Debug, thiserror::Error)]
pub enum MactraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("insufficient data: have {bars} bars, need at least {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("cannot price execution on {date}: reference price {price}")]
    PriceGap { date: NaiveDate, price: f64 },

    #[error("initial capital must be positive, got {capital}")]
    NegativeCapital { capital: f64 },

    #[error("malformed order sequence on {date}: order {order} while {state}")]
    MalformedOrders {
        date: NaiveDate,
        order: i8,
        state: &'static str,
    },

    #[error("bars out of order at index {index}: {date} does not follow {previous}")]
    UnorderedBars {
        index: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MactraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        MactraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the bad-parameter family, reported before any computation starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MactraderError::ConfigParse { .. }
                | MactraderError::ConfigMissing { .. }
                | MactraderError::ConfigInvalid { .. }
        )
    }
}

impl From<&MactraderError> for std::process::ExitCode {
    fn from(err: &MactraderError) -> Self {
        let code: u8 = match err {
            MactraderError::Io(_) | MactraderError::Report { .. } => 1,
            MactraderError::ConfigParse { .. }
            | MactraderError::ConfigMissing { .. }
            | MactraderError::ConfigInvalid { .. } => 2,
            MactraderError::Data { .. } | MactraderError::UnorderedBars { .. } => 3,
            MactraderError::PriceGap { .. }
            | MactraderError::NegativeCapital { .. }
            | MactraderError::MalformedOrders { .. } => 4,
            MactraderError::NoData { .. } | MactraderError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_family() {
        assert!(MactraderError::invalid("strategy", "short_window", "bad").is_configuration());
        assert!(
            MactraderError::ConfigMissing {
                section: "backtest".into(),
                key: "symbol".into(),
            }
            .is_configuration()
        );
        assert!(!MactraderError::NegativeCapital { capital: -1.0 }.is_configuration());
    }

    #[test]
    fn display_includes_context() {
        let err = MactraderError::PriceGap {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            price: 0.0,
        };
        assert_eq!(
            err.to_string(),
            "cannot price execution on 2024-01-15: reference price 0"
        );

        let err = MactraderError::invalid("strategy", "long_window", "must exceed short_window");
        assert_eq!(
            err.to_string(),
            "invalid config value [strategy] long_window: must exceed short_window"
        );
    }
}
