//! CLI definition and dispatch.

use clap::{ArgAction, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    build_backtest_config, build_mean_reversion_params, build_momentum_params, build_param_grid,
    build_strategy,
};
use crate::domain::daily_signal::{daily_signal, DailySignalReport};
use crate::domain::error::TwtraderError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::optimizer::{optimize, OptimizationReport, ParamGrid};
use crate::domain::strategy::{MeanReversionParams, MomentumParams, Strategy};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "twtrader", about = "Single-instrument strategy backtester")]
pub struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest and write trades, equity and metrics CSVs
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>.csv files
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        symbol: Option<String>,
        #[arg(short, long, default_value = "report")]
        output_dir: PathBuf,
    },
    /// Grid-search strategy parameters and rank by Sharpe ratio
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        symbol: Option<String>,
        /// JSON file for the full ranking
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Rows of the ranking to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Latest Momentum and MeanReversion signals with a combined recommendation
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Symbols to report; repeat the flag or separate with commas
        #[arg(short, long, value_delimiter = ',')]
        symbol: Vec<String>,
        /// JSON file for the full report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data_dir,
            symbol,
            output_dir,
        } => run_backtest_command(&config, data_dir, symbol.as_deref(), output_dir),
        Command::Optimize {
            config,
            data_dir,
            symbol,
            output,
            top,
        } => run_optimize_command(&config, data_dir, symbol.as_deref(), output.as_deref(), top),
        Command::Validate { config } => run_validate(&config),
        Command::Signals {
            config,
            data_dir,
            symbol,
            output,
        } => run_signals_command(&config, data_dir, &symbol, output.as_deref()),
    }
}

fn fail(err: TwtraderError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TwtraderError> {
    tracing::info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path).map_err(|e| TwtraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// `--symbol` wins over `[backtest] symbol`.
pub fn resolve_symbol(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<String, TwtraderError> {
    symbol_override
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "symbol"))
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TwtraderError::ConfigMissing {
            section: "backtest".into(),
            key: "symbol".into(),
        })
}

/// `--symbol` values, else `[signals] symbols`, else `[backtest] symbol`.
///
/// Symbols are trimmed and uppercased; repeats keep their first position.
pub fn resolve_symbols(
    overrides: &[String],
    config: &dyn ConfigPort,
) -> Result<Vec<String>, TwtraderError> {
    let raw: Vec<String> = if !overrides.is_empty() {
        overrides.to_vec()
    } else if let Some(list) = config.get_string("signals", "symbols") {
        list.split(',').map(str::to_string).collect()
    } else {
        return resolve_symbol(None, config).map(|symbol| vec![symbol]);
    };

    let mut symbols: Vec<String> = Vec::with_capacity(raw.len());
    for symbol in raw.iter().map(|s| s.trim().to_uppercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    if symbols.is_empty() {
        return Err(TwtraderError::ConfigMissing {
            section: "signals".into(),
            key: "symbols".into(),
        });
    }
    Ok(symbols)
}

/// `--data-dir` wins over `[backtest] data_dir`; defaults to the working directory.
pub fn resolve_data_dir(dir_override: Option<PathBuf>, config: &dyn ConfigPort) -> PathBuf {
    dir_override
        .or_else(|| config.get_string("backtest", "data_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    symbol: &str,
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<(BacktestResult, PerformanceMetrics), TwtraderError> {
    let series = data_port.load_series(symbol)?;

    tracing::info!(
        symbol,
        strategy = strategy.name(),
        bars = series.len(),
        from = %series.first_date(),
        to = %series.last_date(),
        "running backtest"
    );
    strategy.warn_short_history(&series);
    let signals = strategy.generate_signals(&series);
    let result = run_backtest(&series, &signals, config)?;
    let metrics = PerformanceMetrics::compute(
        result.equity_curve(),
        result.trades(),
        config.risk_free_rate,
    );

    report_port.write(&result, strategy, &metrics)?;
    Ok((result, metrics))
}

pub fn run_optimize_pipeline(
    data_port: &dyn DataPort,
    symbol: &str,
    grid: &ParamGrid,
    config: &BacktestConfig,
) -> Result<OptimizationReport, TwtraderError> {
    let series = data_port.load_series(symbol)?;
    optimize(&series, grid, config)
}

/// Daily snapshot for each symbol. Symbols that fail to load or are too
/// short for either strategy's indicators are skipped, not fatal.
pub fn daily_signals_pipeline(
    data_port: &dyn DataPort,
    symbols: &[String],
    momentum: &MomentumParams,
    mean_reversion: &MeanReversionParams,
) -> DailySignalReport {
    let mut report = DailySignalReport::default();
    for symbol in symbols {
        let series = match data_port.load_series(symbol) {
            Ok(series) => series,
            Err(e) => {
                report.skip(symbol, e.to_string());
                continue;
            }
        };

        let warnings: Vec<String> = [
            Strategy::Momentum(*momentum),
            Strategy::MeanReversion(*mean_reversion),
        ]
        .iter()
        .flat_map(|strategy| strategy.history_warnings(series.len()))
        .map(|w| w.to_string())
        .collect();
        if !warnings.is_empty() {
            report.skip(symbol, warnings.join("; "));
            continue;
        }

        report.insert(daily_signal(&series, momentum, mean_reversion));
    }
    report
}

fn run_backtest_command(
    config_path: &Path,
    data_dir: Option<PathBuf>,
    symbol: Option<&str>,
    output_dir: PathBuf,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };
    let setup = build_backtest_config(&adapter)
        .and_then(|bt| Ok((bt, build_strategy(&adapter)?)))
        .and_then(|(bt, strategy)| Ok((bt, strategy, resolve_symbol(symbol, &adapter)?)));
    let (bt_config, strategy, symbol) = match setup {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let data_port = CsvAdapter::new(resolve_data_dir(data_dir, &adapter));
    let report_port = CsvReportAdapter::new(output_dir);

    let (result, metrics) =
        match run_backtest_pipeline(&data_port, &report_port, &symbol, &strategy, &bt_config) {
            Ok(r) => r,
            Err(e) => return fail(e),
        };

    print_summary(&result, &strategy, &metrics);
    eprintln!("\nReport written to: {}", report_port.output_dir().display());
    ExitCode::SUCCESS
}

fn print_summary(result: &BacktestResult, strategy: &Strategy, metrics: &PerformanceMetrics) {
    eprintln!("\n=== {} / {} ===", result.symbol, strategy.name());
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("CAGR:             {:.2}%", metrics.cagr * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Volatility:       {:.2}%", metrics.annualized_volatility * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", metrics.total_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    match metrics.profit_factor {
        Some(pf) => eprintln!("Profit Factor:    {pf:.2}"),
        None => eprintln!("Profit Factor:    n/a (no losing trades)"),
    }
    eprintln!("Final Equity:     {:.2}", metrics.final_equity);
    if result.skipped_entries > 0 {
        eprintln!("Skipped Buys:     {} (insufficient cash)", result.skipped_entries);
    }
}

fn run_optimize_command(
    config_path: &Path,
    data_dir: Option<PathBuf>,
    symbol: Option<&str>,
    output: Option<&Path>,
    top: usize,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };
    let setup = build_backtest_config(&adapter)
        .and_then(|bt| Ok((bt, build_param_grid(&adapter)?)))
        .and_then(|(bt, grid)| Ok((bt, grid, resolve_symbol(symbol, &adapter)?)));
    let (bt_config, grid, symbol) = match setup {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let data_port = CsvAdapter::new(resolve_data_dir(data_dir, &adapter));
    let report = match run_optimize_pipeline(&data_port, &symbol, &grid, &bt_config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    eprintln!("\n=== {} candidates for {} ===", report.len(), report.symbol);
    for (rank, run) in report.runs.iter().take(top).enumerate() {
        eprintln!(
            "{:>3}. sharpe {:>6.2}  return {:>7.2}%  trades {:>3}  {}",
            rank + 1,
            run.metrics.sharpe_ratio,
            run.metrics.total_return * 100.0,
            run.metrics.total_trades,
            describe(&run.strategy),
        );
    }

    if let Some(path) = output {
        let written = File::create(path)
            .map_err(TwtraderError::from)
            .and_then(|file| report.write_json(BufWriter::new(file)));
        if let Err(e) = written {
            return fail(e);
        }
        eprintln!("\nResults written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn describe(strategy: &Strategy) -> String {
    match strategy {
        Strategy::Momentum(p) => format!("fast={} slow={}", p.fast_window, p.slow_window),
        Strategy::MeanReversion(p) => format!(
            "rsi={} oversold={} overbought={} atr={} stop={}",
            p.rsi_window, p.oversold, p.overbought, p.atr_window, p.stop_multiple
        ),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let strategy = match build_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    eprintln!("Backtest:");
    eprintln!("  initial_cash:    {}", bt_config.initial_capital);
    eprintln!("  commission_rate: {}", bt_config.execution.commission_rate);
    eprintln!("  slippage_rate:   {}", bt_config.execution.slippage_rate);
    eprintln!("  fill_policy:     {}", bt_config.execution.fill_policy);
    eprintln!("  risk_free_rate:  {}", bt_config.risk_free_rate);
    eprintln!("\nStrategy: {} ({})", strategy.name(), describe(&strategy));
    let indicators: Vec<String> = strategy.indicators().iter().map(|i| i.to_string()).collect();
    eprintln!("  indicators: {}", indicators.join(", "));

    match build_param_grid(&adapter) {
        Ok(grid) => {
            let valid = grid.candidates().len();
            eprintln!("\nOptimize grid: {} combinations, {} valid", grid.size(), valid);
        }
        Err(e) => return fail(e),
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_signals_command(
    config_path: &Path,
    data_dir: Option<PathBuf>,
    symbols: &[String],
    output: Option<&Path>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };
    let setup = build_momentum_params(&adapter)
        .and_then(|momentum| Ok((momentum, build_mean_reversion_params(&adapter)?)))
        .and_then(|(momentum, reversion)| {
            Ok((momentum, reversion, resolve_symbols(symbols, &adapter)?))
        });
    let (momentum, reversion, symbols) = match setup {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let data_port = CsvAdapter::new(resolve_data_dir(data_dir, &adapter));
    let report = daily_signals_pipeline(&data_port, &symbols, &momentum, &reversion);

    for signal in report.signals.values() {
        println!(
            "{} {} close {:.2} momentum {} mean_reversion {} -> {}",
            signal.symbol,
            signal.date,
            signal.close,
            signal.momentum.signal,
            signal.mean_reversion.signal,
            signal.recommendation,
        );
    }
    for skipped in &report.skipped {
        eprintln!("skipped {}: {}", skipped.symbol, skipped.reason);
    }

    if let Some(path) = output {
        let written = File::create(path)
            .map_err(TwtraderError::from)
            .and_then(|file| report.write_json(BufWriter::new(file)));
        if let Err(e) = written {
            return fail(e);
        }
        eprintln!("\nSignals written to: {}", path.display());
    }

    if report.signals.is_empty() {
        return fail(TwtraderError::NoData {
            symbol: symbols.join(","),
        });
    }
    ExitCode::SUCCESS
}
