//! Configuration validation.
//!
//! Validates all config fields before a backtest runs.

use crate::domain::error::MactraderError;
use crate::domain::execution::ExecutionTiming;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_SHORT_WINDOW: i64 = 100;
pub const DEFAULT_LONG_WINDOW: i64 = 400;
pub const DEFAULT_LOT_SIZE: f64 = 100.0;
pub const DEFAULT_WARMUP: i64 = 5;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), MactraderError> {
    validate_initial_capital(config)?;
    validate_dates(config)?;
    validate_symbols(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), MactraderError> {
    match strategy_kind(config)?.as_str() {
        "ma_cross" => validate_windows(config)?,
        _ => {
            validate_warmup(config)?;
            validate_seed(config)?;
        }
    }
    validate_sizing(config)?;
    validate_execution(config)?;
    Ok(())
}

/// `ma_cross` unless `[strategy] kind` says otherwise.
pub fn strategy_kind(config: &dyn ConfigPort) -> Result<String, MactraderError> {
    let kind = config
        .get_string("strategy", "kind")
        .map(|k| k.trim().to_lowercase())
        .unwrap_or_else(|| "ma_cross".to_string());
    match kind.as_str() {
        "ma_cross" | "random" => Ok(kind),
        other => Err(MactraderError::invalid(
            "strategy",
            "kind",
            format!("unknown strategy kind '{other}' (expected ma_cross or random)"),
        )),
    }
}

/// `fixed` unless `[strategy] sizing` says otherwise.
pub fn sizing_kind(config: &dyn ConfigPort) -> Result<String, MactraderError> {
    let sizing = config
        .get_string("strategy", "sizing")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "fixed".to_string());
    match sizing.as_str() {
        "fixed" | "capital" => Ok(sizing),
        other => Err(MactraderError::invalid(
            "strategy",
            "sizing",
            format!("unknown sizing policy '{other}' (expected fixed or capital)"),
        )),
    }
}

/// Reads a numeric key. An absent key yields `default`; a present one that
/// does not parse is an error rather than a silent fallback.
pub fn number<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, MactraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            MactraderError::invalid(section, key, format!("expected a number, got '{}'", raw.trim()))
        }),
    }
}

/// A `[strategy]` integer that must not be negative.
pub fn non_negative(
    config: &dyn ConfigPort,
    key: &str,
    default: i64,
) -> Result<u64, MactraderError> {
    let value = number(config, "strategy", key, default)?;
    u64::try_from(value).map_err(|_| {
        MactraderError::invalid("strategy", key, format!("{key} must not be negative"))
    })
}

pub fn execution_timing(config: &dyn ConfigPort) -> Result<ExecutionTiming, MactraderError> {
    match config.get_string("strategy", "execution") {
        None => Ok(ExecutionTiming::default()),
        Some(s) => s
            .parse()
            .map_err(|reason: String| MactraderError::invalid("strategy", "execution", reason)),
    }
}

pub fn parse_date(
    value: Option<&str>,
    section: &str,
    field: &str,
) -> Result<Option<NaiveDate>, MactraderError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                MactraderError::invalid(
                    section,
                    field,
                    format!("invalid {field} format, expected YYYY-MM-DD"),
                )
            }),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), MactraderError> {
    let value = number(config, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?;
    if !(value.is_finite() && value > 0.0) {
        return Err(MactraderError::NegativeCapital { capital: value });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), MactraderError> {
    let start = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "backtest",
        "start_date",
    )?;
    let end = parse_date(
        config.get_string("backtest", "end_date").as_deref(),
        "backtest",
        "end_date",
    )?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(MactraderError::invalid(
                "backtest",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), MactraderError> {
    let symbols = config.get_string("backtest", "symbols");
    let symbol = config.get_string("backtest", "symbol");

    let (key, raw) = match (symbols, symbol) {
        (Some(s), _) if !s.trim().is_empty() => ("symbols", s),
        (_, Some(s)) if !s.trim().is_empty() => ("symbol", s),
        _ => {
            return Err(MactraderError::ConfigMissing {
                section: "backtest".to_string(),
                key: "symbol".to_string(),
            })
        }
    };
    parse_symbols(&raw).map_err(|e| MactraderError::invalid("backtest", key, e.to_string()))?;
    Ok(())
}

fn positive_int(config: &dyn ConfigPort, key: &str, default: i64) -> Result<i64, MactraderError> {
    let value = number(config, "strategy", key, default)?;
    if value < 1 {
        return Err(MactraderError::invalid(
            "strategy",
            key,
            format!("{key} must be positive"),
        ));
    }
    Ok(value)
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), MactraderError> {
    let short = positive_int(config, "short_window", DEFAULT_SHORT_WINDOW)?;
    let long = positive_int(config, "long_window", DEFAULT_LONG_WINDOW)?;
    if short >= long {
        return Err(MactraderError::invalid(
            "strategy",
            "long_window",
            format!("long_window ({long}) must exceed short_window ({short})"),
        ));
    }
    Ok(())
}

fn validate_warmup(config: &dyn ConfigPort) -> Result<(), MactraderError> {
    non_negative(config, "warmup", DEFAULT_WARMUP).map(|_| ())
}

fn validate_seed(config: &dyn ConfigPort) -> Result<(), MactraderError> {
    non_negative(config, "seed", 0).map(|_| ())
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), MactraderError> {
    if sizing_kind(config)? == "fixed" {
        let lot = number(config, "strategy", "lot_size", DEFAULT_LOT_SIZE)?;
        if !(lot.is_finite() && lot > 0.0) {
            return Err(MactraderError::invalid(
                "strategy",
                "lot_size",
                "lot_size must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_execution(config: &dyn ConfigPort) -> Result<(), MactraderError> {
    execution_timing(config).map(|_| ())
}
