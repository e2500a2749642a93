//! CSV report adapter implementing ReportPort.
//!
//! Writes three files into the output directory:
//! `trades.csv` (one row per closed trade), `equity.csv` (one row per bar)
//! and `metrics.csv` (`metric,value` pairs).

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TwtraderError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::strategy::Strategy;
use crate::ports::report_port::ReportPort;

pub const TRADES_FILE: &str = "trades.csv";
pub const EQUITY_FILE: &str = "equity.csv";
pub const METRICS_FILE: &str = "metrics.csv";

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        metrics: &PerformanceMetrics,
    ) -> Result<(), TwtraderError> {
        fs::create_dir_all(&self.output_dir)?;

        write_rows(&self.output_dir.join(TRADES_FILE), result.trades())?;
        write_rows(&self.output_dir.join(EQUITY_FILE), result.equity_curve())?;

        let mut wtr = csv::Writer::from_path(self.output_dir.join(METRICS_FILE))?;
        wtr.write_record(["metric", "value"])?;
        for (name, value) in metric_rows(result, strategy, metrics)? {
            wtr.write_record([name, value.as_str()])?;
        }
        wtr.flush()?;

        tracing::info!(
            dir = %self.output_dir.display(),
            trades = result.trades().len(),
            "report written"
        );
        Ok(())
    }
}

fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<(), TwtraderError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn metric_rows(
    result: &BacktestResult,
    strategy: &Strategy,
    m: &PerformanceMetrics,
) -> Result<Vec<(&'static str, String)>, TwtraderError> {
    Ok(vec![
        ("symbol", result.symbol.clone()),
        ("strategy", strategy.name().to_string()),
        ("parameters", serde_json::to_string(strategy)?),
        ("total_return", m.total_return.to_string()),
        ("cagr", m.cagr.to_string()),
        ("max_drawdown", m.max_drawdown.to_string()),
        ("max_drawdown_duration", m.max_drawdown_duration.to_string()),
        ("sharpe_ratio", m.sharpe_ratio.to_string()),
        ("sortino_ratio", m.sortino_ratio.to_string()),
        ("annualized_volatility", m.annualized_volatility.to_string()),
        ("win_rate", m.win_rate.to_string()),
        ("total_trades", m.total_trades.to_string()),
        ("trades_won", m.trades_won.to_string()),
        ("trades_lost", m.trades_lost.to_string()),
        ("trades_breakeven", m.trades_breakeven.to_string()),
        (
            "profit_factor",
            m.profit_factor.map(|pf| pf.to_string()).unwrap_or_default(),
        ),
        ("avg_win", m.avg_win.to_string()),
        ("avg_loss", m.avg_loss.to_string()),
        ("largest_win", m.largest_win.to_string()),
        ("largest_loss", m.largest_loss.to_string()),
        ("avg_trade_duration", m.avg_trade_duration.to_string()),
        ("final_equity", m.final_equity.to_string()),
        ("skipped_entries", result.skipped_entries.to_string()),
    ])
}
