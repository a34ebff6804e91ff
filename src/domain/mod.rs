//! Core domain types and logic.

pub mod bar;
pub mod moving_average;
pub mod signal;
pub mod sizing;
pub mod execution;
pub mod ledger;
pub mod accountant;
pub mod backtest;
pub mod universe;
pub mod config_validation;
pub mod error;
