//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_chart::SvgChartAdapter;
use crate::domain::backtest::{run_universe, BacktestConfig, BacktestResult, StrategyParams};
use crate::domain::config_validation::{
    execution_timing, non_negative, number, parse_date, sizing_kind, strategy_kind,
    validate_backtest_config, validate_strategy_config, DEFAULT_INITIAL_CAPITAL, DEFAULT_LONG_WINDOW, DEFAULT_LOT_SIZE,
    DEFAULT_SHORT_WINDOW, DEFAULT_WARMUP,
};
use crate::domain::error::MactraderError;
use crate::domain::ledger::LedgerEntry;
use crate::domain::signal::Strategy;
use crate::domain::sizing::SizingPolicy;
use crate::domain::universe::{load_universe, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, DateRange};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "mactrader", about = "Moving-average crossover backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the configured symbol list
        #[arg(long)]
        symbol: Option<String>,
        /// Directory for ledger CSVs and charts
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory holding <SYMBOL>.csv price files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Print the last N ledger rows per symbol
        #[arg(long, default_value_t = 10)]
        show: usize,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols with price files in a data directory
    ListSymbols {
        #[arg(long)]
        data_dir: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            output,
            data_dir,
            show,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(
                    &config,
                    symbol.as_deref(),
                    output.as_ref(),
                    data_dir.as_ref(),
                    show,
                )
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data_dir } => run_list_symbols(&data_dir),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn validate_all(adapter: &dyn ConfigPort) -> Result<(), MactraderError> {
    validate_backtest_config(adapter)?;
    validate_strategy_config(adapter)?;
    Ok(())
}

fn run_backtest(
    config_path: &Path,
    symbol_override: Option<&str>,
    output_override: Option<&PathBuf>,
    data_dir_override: Option<&PathBuf>,
    show: usize,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 2: Build run parameters
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let range = match build_date_range(&adapter) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let symbols = match resolve_symbols(symbol_override, &adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data_dir = data_dir_override
        .cloned()
        .or_else(|| adapter.get_string("backtest", "data_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let output_dir = output_override
        .cloned()
        .or_else(|| adapter.get_string("report", "output_dir").map(PathBuf::from));
    let options = PipelineOptions {
        output_dir,
        chart: adapter.get_bool("report", "chart", false),
        parallel: adapter.get_bool("backtest", "parallel", false),
        show,
    };

    // Stage 3: Data + pipeline
    let data_port = CsvAdapter::new(data_dir);
    run_backtest_pipeline(&data_port, &bt_config, &symbols, range, &options)
}

fn window(adapter: &dyn ConfigPort, key: &str, default: i64) -> Result<usize, MactraderError> {
    let value = non_negative(adapter, key, default)?;
    usize::try_from(value)
        .map_err(|_| MactraderError::invalid("strategy", key, format!("{key} is too large")))
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, MactraderError> {
    let strategy = match strategy_kind(adapter)?.as_str() {
        "random" => StrategyParams::RandomForecast {
            seed: non_negative(adapter, "seed", 0)?,
            warmup: window(adapter, "warmup", DEFAULT_WARMUP)?,
        },
        _ => StrategyParams::MovingAverageCross {
            short_window: window(adapter, "short_window", DEFAULT_SHORT_WINDOW)?,
            long_window: window(adapter, "long_window", DEFAULT_LONG_WINDOW)?,
        },
    };

    let sizing = match sizing_kind(adapter)?.as_str() {
        "capital" => SizingPolicy::CapitalProportional,
        _ => SizingPolicy::FixedLot(number(adapter, "strategy", "lot_size", DEFAULT_LOT_SIZE)?),
    };

    let config = BacktestConfig {
        strategy,
        initial_capital: number(adapter, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?,
        sizing,
        timing: execution_timing(adapter)?,
        strict_orders: adapter.get_bool("strategy", "strict_orders", false),
    };
    config.validate()?;
    Ok(config)
}

pub fn build_date_range(adapter: &dyn ConfigPort) -> Result<DateRange, MactraderError> {
    let start = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "backtest",
        "start_date",
    )?;
    let end = parse_date(
        adapter.get_string("backtest", "end_date").as_deref(),
        "backtest",
        "end_date",
    )?;
    Ok(DateRange::new(start, end))
}

/// `--symbol` wins over `symbols`, which wins over `symbol`.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, MactraderError> {
    let (key, raw) = match symbol_override {
        Some(s) => ("symbol", s.to_string()),
        None => match (
            config.get_string("backtest", "symbols"),
            config.get_string("backtest", "symbol"),
        ) {
            (Some(s), _) if !s.trim().is_empty() => ("symbols", s),
            (_, Some(s)) => ("symbol", s),
            _ => {
                return Err(MactraderError::ConfigMissing {
                    section: "backtest".into(),
                    key: "symbol".into(),
                })
            }
        },
    };
    parse_symbols(&raw).map_err(|e| MactraderError::invalid("backtest", key, e.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub output_dir: Option<PathBuf>,
    pub chart: bool,
    pub parallel: bool,
    pub show: usize,
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    bt_config: &BacktestConfig,
    symbols: &[String],
    range: DateRange,
    options: &PipelineOptions,
) -> ExitCode {
    // Stage 4: Fetch every series before the core runs
    eprintln!("Loading {} symbol(s)...", symbols.len());
    let universe = match load_universe(data_port, symbols, range) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    for skipped in &universe.skipped {
        eprintln!("warning: skipping {} ({:?})", skipped.symbol, skipped.reason);
    }

    // Stage 5: Run
    eprintln!(
        "Running {} on {} symbol(s): capital {:.2}, {}, fill at {}",
        bt_config.strategy.name(),
        universe.count(),
        bt_config.initial_capital,
        bt_config.sizing,
        bt_config.timing,
    );
    let outcomes = run_universe(&universe.series, bt_config, options.parallel);

    let mut results: Vec<BacktestResult> = Vec::with_capacity(outcomes.len());
    let mut first_error: Option<MactraderError> = None;
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                eprintln!("error: {symbol}: {e}");
                first_error.get_or_insert(e);
            }
        }
    }

    // Stage 6: Console summary
    for result in &results {
        print_summary(result, options.show);
    }

    // Stage 7: Reports
    if let Some(dir) = &options.output_dir {
        if let Err(e) = write_reports(&results, dir, options.chart) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    match first_error {
        Some(e) => (&e).into(),
        None => ExitCode::SUCCESS,
    }
}

fn write_reports(
    results: &[BacktestResult],
    dir: &Path,
    chart: bool,
) -> Result<(), MactraderError> {
    fs::create_dir_all(dir)?;
    let mut written = CsvReportAdapter.write_all(results, dir)?;
    if chart {
        written.extend(SvgChartAdapter.write_all(results, dir)?);
    }
    for path in written {
        eprintln!("Report written to: {}", path.display());
    }
    Ok(())
}

fn print_summary(result: &BacktestResult, show: usize) {
    let ledger = &result.ledger;
    let trades = ledger.trades();

    eprintln!("\n=== {} ===", result.symbol);
    eprintln!("Bars:             {}", ledger.len());
    eprintln!("Trades:           {}", trades.len());
    eprintln!("Initial Capital:  {:.2}", ledger.initial_capital());
    eprintln!("Final Value:      {:.2}", ledger.final_value());
    eprintln!("Total Return:     {:.2}%", ledger.total_return() * 100.0);

    if show > 0 && !ledger.is_empty() {
        println!(
            "{:<10}  {:>12}  {:>5}  {:>12}  {:>14}  {:>14}  {:>14}  {:>9}",
            "date", "price", "order", "held", "cash", "holdings", "total", "return"
        );
        for entry in ledger.tail(show) {
            println!("{}", format_entry(entry));
        }
    }
}

pub fn format_entry(entry: &LedgerEntry) -> String {
    format!(
        "{:<10}  {:>12.4}  {:>5}  {:>12.2}  {:>14.2}  {:>14.2}  {:>14.2}  {:>8.4}%",
        entry.date,
        entry.reference_price,
        entry.order,
        entry.held_quantity,
        entry.cash,
        entry.holdings_value,
        entry.total_value,
        entry.period_return * 100.0
    )
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let described = validate_all(&adapter)
        .and_then(|()| build_backtest_config(&adapter))
        .and_then(|config| {
            let symbols = resolve_symbols(None, &adapter)?;
            let range = build_date_range(&adapter)?;
            Ok((config, symbols, range))
        });

    let (config, symbols, range) = match described {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Config validated successfully");
    eprintln!("\nStrategy:");
    eprintln!("  {}", config.strategy.name());
    eprintln!("  sizing:    {}", config.sizing);
    eprintln!("  execution: {}", config.timing);
    eprintln!("  capital:   {:.2}", config.initial_capital);
    eprintln!("\nUniverse:");
    eprintln!("  symbols: {}", symbols.join(", "));
    if let Some(start) = range.start {
        eprintln!("  from:    {}", start);
    }
    if let Some(end) = range.end {
        eprintln!("  to:      {}", end);
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_all(&adapter).and_then(|()| build_backtest_config(&adapter)) {
        Ok(config) => {
            eprintln!("  {}", config.strategy.name());
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_list_symbols(data_dir: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    match adapter.list_symbols() {
        Ok(symbols) if symbols.is_empty() => {
            eprintln!("No price files found in {}", data_dir.display());
            ExitCode::SUCCESS
        }
        Ok(symbols) => {
            for symbol in &symbols {
                println!("{}", symbol);
            }
            eprintln!("{} symbols found", symbols.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
