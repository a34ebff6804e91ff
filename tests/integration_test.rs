//! Integration tests for the signal -> sizing -> accounting pipeline.
//!
//! Tests cover:
//! - Hand-worked ledgers for both accounting variants
//! - Moving-average warm-up and the short-window signal guard
//! - Boundary cases (no orders, single bar, missing prices)
//! - Ledger invariants over generated price paths (proptest)
//! - Universe loading and multi-symbol runs with a mock data port

mod common;

use approx::assert_relative_eq;
use common::*;
use mactrader::domain::accountant::{
    Accountant, CapitalConstrainedAccountant, FixedQuantityAccountant,
};
use mactrader::domain::backtest::{run_backtest, run_universe, BacktestConfig, StrategyParams};
use mactrader::domain::error::MactraderError;
use mactrader::domain::execution::ExecutionTiming;
use mactrader::domain::signal::{generate, SignalSeries};
use mactrader::domain::sizing::{size, SizingPolicy};
use mactrader::domain::universe::{load_universe, SkipReason};
use mactrader::ports::data_port::DateRange;
use proptest::prelude::*;

fn capital_accountant(initial_capital: f64) -> CapitalConstrainedAccountant {
    CapitalConstrainedAccountant {
        initial_capital,
        timing: ExecutionTiming::SameBarClose,
        strict_orders: false,
    }
}

fn fixed_accountant(initial_capital: f64) -> FixedQuantityAccountant {
    FixedQuantityAccountant {
        initial_capital,
        timing: ExecutionTiming::SameBarClose,
    }
}

mod worked_ledgers {
    use super::*;

    #[test]
    fn capital_constrained_round_trip_at_flat_price() {
        let prices = series(&[10.0, 10.0, 10.0, 10.0, 10.0]);
        let signals = SignalSeries::from_signals(&prices.dates(), &[0, 1, 1, 0, 0]);
        assert_eq!(signals.orders(), vec![0, 1, 0, -1, 0]);

        let positions = size(&signals, SizingPolicy::CapitalProportional);
        let ledger = capital_accountant(100.0).run(&positions, &prices).unwrap();

        let held: Vec<f64> = ledger.entries().iter().map(|e| e.held_quantity).collect();
        let cash: Vec<f64> = ledger.entries().iter().map(|e| e.cash).collect();
        assert_eq!(held, vec![0.0, 10.0, 10.0, 0.0, 0.0]);
        assert_eq!(cash, vec![100.0, 0.0, 0.0, 100.0, 100.0]);
        assert_eq!(ledger.totals(), vec![100.0; 5]);
    }

    #[test]
    fn fixed_lot_round_trip_at_flat_price() {
        let prices = series(&[10.0, 10.0, 10.0, 10.0, 10.0]);
        let signals = SignalSeries::from_signals(&prices.dates(), &[0, 1, 1, 0, 0]);
        let positions = size(&signals, SizingPolicy::FixedLot(5.0));
        assert_eq!(positions.target_quantities(), vec![0.0, 5.0, 5.0, 0.0, 0.0]);

        let ledger = fixed_accountant(100.0).run(&positions, &prices).unwrap();

        let cash: Vec<f64> = ledger.entries().iter().map(|e| e.cash).collect();
        let holdings: Vec<f64> = ledger.entries().iter().map(|e| e.holdings_value).collect();
        assert_eq!(cash, vec![100.0, 50.0, 50.0, 100.0, 100.0]);
        assert_eq!(holdings, vec![0.0, 50.0, 50.0, 0.0, 0.0]);
        assert_eq!(ledger.totals(), vec![100.0; 5]);
        assert!(ledger.returns().iter().all(|&r| r == 0.0));
    }

    #[test]
    fn warm_up_averages_and_short_window_guard() {
        let prices = series(&[1.0, 2.0, 3.0, 10.0, 1.0]);
        let signals = generate(&prices, 2, 3).unwrap();

        let short = signals.short_mavg().unwrap();
        let long = signals.long_mavg().unwrap();
        assert_relative_eq!(short[0], 1.0);
        assert_relative_eq!(short[1], 1.5);
        assert_relative_eq!(long[0], 1.0);
        assert_relative_eq!(long[1], 1.5);
        assert_relative_eq!(long[2], 2.0);
        assert_relative_eq!(short[4], 5.5);
        assert_relative_eq!(long[4], 14.0 / 3.0);

        // Index 1 has short == long and index 0 is guarded regardless.
        assert_eq!(signals.signals(), vec![0, 0, 1, 1, 1]);
        assert_eq!(signals.orders(), vec![0, 0, 1, 0, 0]);
        assert_eq!(signals.buy_dates(), vec![date(2024, 1, 3)]);
        assert!(signals.sell_dates().is_empty());
    }

    #[test]
    fn capital_pipeline_buys_whole_shares_and_keeps_remainder() {
        let prices = series(&crossover_closes());
        let result = run_backtest(
            "TEST",
            &prices,
            &ma_config(2, 4, SizingPolicy::CapitalProportional),
        )
        .unwrap();

        let trades = result.ledger.trades();
        assert_eq!(trades.len(), 2);
        // floor(1000 / 6) = 166 shares, 4 left over; sold at 2.
        assert_eq!(trades[0].quantity, 166.0);
        assert_eq!(trades[0].price, 6.0);
        assert_eq!(trades[1].price, 2.0);
        assert_relative_eq!(result.ledger.entries()[2].cash, 4.0);
        assert_relative_eq!(result.ledger.final_value(), 4.0 + 166.0 * 2.0);
    }

    #[test]
    fn next_bar_open_fills_at_following_open() {
        let mut bars = bars_from_closes(&[10.0, 10.0, 10.0, 10.0]);
        bars[2].open = 8.0;
        let prices = mactrader::domain::bar::PriceSeries::new(bars).unwrap();
        let signals = SignalSeries::from_signals(&prices.dates(), &[0, 1, 1, 1]);
        let positions = size(&signals, SizingPolicy::CapitalProportional);

        let accountant = CapitalConstrainedAccountant {
            initial_capital: 100.0,
            timing: ExecutionTiming::NextBarOpen,
            strict_orders: false,
        };
        let ledger = accountant.run(&positions, &prices).unwrap();

        // Order on bar 1 fills at bar 2's open of 8: floor(100/8) = 12 shares.
        assert_eq!(ledger.entries()[1].held_quantity, 12.0);
        assert_relative_eq!(ledger.entries()[1].cash, 4.0);
        assert_eq!(ledger.entries()[1].reference_price, 8.0);
        // The last bar has no next open and is marked at its own close.
        assert_eq!(ledger.entries()[3].reference_price, 10.0);
    }
}

mod boundaries {
    use super::*;

    #[test]
    fn no_orders_leaves_cash_untouched() {
        let prices = series(&[10.0, 9.0, 8.0, 7.0, 6.0]);
        let result = run_backtest(
            "DOWN",
            &prices,
            &ma_config(2, 3, SizingPolicy::CapitalProportional),
        )
        .unwrap();

        assert!(!result.signals.has_orders());
        assert!(result.ledger.trades().is_empty());
        assert!(result.ledger.entries().iter().all(|e| e.cash == 1000.0));
        assert_eq!(result.ledger.total_return(), 0.0);
    }

    #[test]
    fn single_bar_is_flat() {
        let prices = series(&[42.0]);
        let result =
            run_backtest("ONE", &prices, &ma_config(1, 2, SizingPolicy::FixedLot(1.0))).unwrap();
        assert_eq!(result.ledger.len(), 1);
        assert_eq!(result.ledger.entries()[0].order, 0);
        assert_eq!(result.ledger.final_value(), 1000.0);
    }

    #[test]
    fn empty_series_is_insufficient_data() {
        let prices = series(&[]);
        let err = run_backtest("NONE", &prices, &ma_config(2, 3, SizingPolicy::FixedLot(1.0)))
            .unwrap_err();
        assert!(matches!(err, MactraderError::InsufficientData { bars: 0, .. }));
    }

    #[test]
    fn missing_price_on_a_trade_bar_is_a_gap() {
        let prices = series(&[10.0, f64::NAN, 10.0]);
        let signals = SignalSeries::from_signals(&prices.dates(), &[0, 1, 1]);
        let positions = size(&signals, SizingPolicy::CapitalProportional);
        let err = capital_accountant(100.0).run(&positions, &prices).unwrap_err();
        assert!(matches!(err, MactraderError::PriceGap { date: d, .. } if d == date(2024, 1, 2)));
    }

    #[test]
    fn missing_price_while_flat_is_tolerated() {
        let prices = series(&[10.0, f64::NAN, 10.0]);
        let signals = SignalSeries::from_signals(&prices.dates(), &[0, 0, 0]);
        let positions = size(&signals, SizingPolicy::CapitalProportional);
        let ledger = capital_accountant(100.0).run(&positions, &prices).unwrap();
        assert_eq!(ledger.totals(), vec![100.0; 3]);
    }
}

mod universe_runs {
    use super::*;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn skips_missing_and_failing_symbols() {
        let port = MockDataPort::new()
            .with_bars("AAA", wave_bars(60, 50.0))
            .with_error("BBB", "corrupt file");

        let universe =
            load_universe(&port, &symbols(&["AAA", "BBB", "CCC"]), DateRange::default()).unwrap();

        assert_eq!(universe.count(), 1);
        assert_eq!(universe.series[0].0, "AAA");
        assert_eq!(universe.skipped.len(), 2);
        assert!(matches!(&universe.skipped[0].reason, SkipReason::Failed(r) if r.contains("corrupt")));
        assert_eq!(universe.skipped[1].symbol, "CCC");
    }

    #[test]
    fn empty_range_counts_as_no_data() {
        let port = MockDataPort::new().with_bars("AAA", wave_bars(10, 50.0));
        let range = DateRange::new(Some(date(2030, 1, 1)), None);
        let err = load_universe(&port, &symbols(&["AAA"]), range).unwrap_err();
        assert!(matches!(err, MactraderError::InsufficientData { .. }));
    }

    #[test]
    fn parallel_and_sequential_runs_agree() {
        let port = MockDataPort::new()
            .with_bars("AAA", wave_bars(120, 50.0))
            .with_bars("BBB", wave_bars(120, 80.0))
            .with_bars("CCC", wave_bars(120, 20.0));
        let universe = load_universe(
            &port,
            &symbols(&["AAA", "BBB", "CCC"]),
            DateRange::default(),
        )
        .unwrap();
        let config = ma_config(3, 9, SizingPolicy::CapitalProportional);

        let sequential = run_universe(&universe.series, &config, false);
        let parallel = run_universe(&universe.series, &config, true);

        assert_eq!(sequential.len(), 3);
        for ((sym_a, a), (sym_b, b)) in sequential.iter().zip(&parallel) {
            assert_eq!(sym_a, sym_b);
            assert_eq!(a.as_ref().unwrap(), b.as_ref().unwrap());
        }
    }

    #[test]
    fn random_forecast_is_reproducible_per_seed() {
        let prices = series(&wave_bars(50, 30.0).iter().map(|b| b.close).collect::<Vec<_>>());
        let config = BacktestConfig {
            strategy: StrategyParams::RandomForecast { seed: 7, warmup: 5 },
            ..ma_config(1, 2, SizingPolicy::CapitalProportional)
        };
        let a = run_backtest("R", &prices, &config).unwrap();
        let b = run_backtest("R", &prices, &config).unwrap();
        assert_eq!(a, b);
        assert!(a.signals.signals()[..5].iter().all(|&s| s == 0));
        assert!(a.signals.averages().is_none());
    }
}

fn closes_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..200.0, 1..80)
}

proptest! {
    #[test]
    fn totals_reconcile_for_both_variants(
        closes in closes_strategy(),
        short in 1usize..5,
        extra in 1usize..8,
        lot in 1u32..50,
    ) {
        let prices = series(&closes);
        for sizing in [SizingPolicy::FixedLot(f64::from(lot)), SizingPolicy::CapitalProportional] {
            let result = run_backtest("P", &prices, &ma_config(short, short + extra, sizing)).unwrap();
            for e in result.ledger.entries() {
                prop_assert!((e.total_value - (e.cash + e.holdings_value)).abs() < 1e-6);
                prop_assert!((e.holdings_value - e.held_quantity * e.reference_price).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn orders_sum_to_final_signal(
        closes in closes_strategy(),
        short in 1usize..5,
        extra in 1usize..8,
    ) {
        let signals = generate(&series(&closes), short, short + extra).unwrap();
        let orders = signals.orders();
        prop_assert_eq!(orders[0], 0);
        prop_assert!(orders.iter().all(|o| (-1..=1).contains(o)));
        let sum: i32 = orders.iter().map(|&o| i32::from(o)).sum();
        prop_assert_eq!(sum, i32::from(*signals.signals().last().unwrap()));
    }

    #[test]
    fn capital_constrained_never_overdraws(
        closes in closes_strategy(),
        short in 1usize..5,
        extra in 1usize..8,
    ) {
        let prices = series(&closes);
        let result = run_backtest(
            "P",
            &prices,
            &ma_config(short, short + extra, SizingPolicy::CapitalProportional),
        )
        .unwrap();
        for e in result.ledger.entries() {
            prop_assert!(e.cash >= 0.0);
            prop_assert!(e.held_quantity >= 0.0);
            prop_assert_eq!(e.held_quantity, e.held_quantity.floor());
        }
    }

    #[test]
    fn reruns_are_identical(
        closes in closes_strategy(),
        short in 1usize..5,
        extra in 1usize..8,
    ) {
        let prices = series(&closes);
        let config = ma_config(short, short + extra, SizingPolicy::FixedLot(10.0));
        let first = run_backtest("P", &prices, &config).unwrap();
        let second = run_backtest("P", &prices, &config).unwrap();
        prop_assert_eq!(first, second);
    }
}
