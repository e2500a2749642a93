//! Backtest engine and event loop.
//!
//! A run is a sequential fold over the bars of one [`PriceSeries`] with the
//! [`Portfolio`] as accumulator. Per bar:
//!
//! 1. (NextOpen) execute the order queued by the previous bar's signal at this open
//! 2. stop-loss check against the bar's low; a hit closes at the stop price
//! 3. otherwise act on this bar's signal, at this close (SameClose) or
//!    queued for the next open (NextOpen); a Buy on the last bar is dropped
//!    under either policy
//! 4. on the last bar, liquidate any open position at the close (EndOfData)
//! 5. mark to market at the close and append one equity point
//!
//! BacktestConfig defines backtest parameters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::TwtraderError;
use super::execution::{enter_long, exit_position, EntryResult, ExecutionConfig, FillPolicy};
use super::ohlcv::OhlcvBar;
use super::portfolio::{EquityPoint, Portfolio};
use super::position::{ExitReason, Trade};
use super::price_series::PriceSeries;
use super::signal::{Signal, SignalPoint};
use super::strategy::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub execution: ExecutionConfig,
    /// Annual rate, used only by the risk-adjusted metrics.
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 100_000.0,
            execution: ExecutionConfig::default(),
            risk_free_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), TwtraderError> {
        if !(self.initial_capital > 0.0 && self.initial_capital.is_finite()) {
            return Err(TwtraderError::configuration(
                "backtest",
                "initial_cash",
                "initial_cash must be positive",
            ));
        }
        if !(self.execution.commission_rate >= 0.0 && self.execution.commission_rate.is_finite())
        {
            return Err(TwtraderError::configuration(
                "backtest",
                "commission_rate",
                "commission_rate must be non-negative",
            ));
        }
        if !(self.execution.slippage_rate >= 0.0 && self.execution.slippage_rate < 1.0) {
            return Err(TwtraderError::configuration(
                "backtest",
                "slippage_rate",
                "slippage_rate must be in [0, 1)",
            ));
        }
        if !(self.risk_free_rate >= 0.0 && self.risk_free_rate < 1.0) {
            return Err(TwtraderError::configuration(
                "backtest",
                "risk_free_rate",
                "risk_free_rate must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub portfolio: Portfolio,
    /// Buy signals that could not afford a single share.
    pub skipped_entries: usize,
}

impl BacktestResult {
    pub fn trades(&self) -> &[Trade] {
        &self.portfolio.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.portfolio.equity_curve
    }

    pub fn final_equity(&self) -> f64 {
        self.portfolio
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.portfolio.initial_capital)
    }
}

/// Validate, generate signals and simulate in one call.
pub fn run_strategy(
    series: &PriceSeries,
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, TwtraderError> {
    strategy.validate()?;
    config.validate()?;
    strategy.warn_short_history(series);
    let signals = strategy.generate_signals(series);
    run_backtest(series, &signals, config)
}

/// Simulate `signals` over `series`.
///
/// Fails before simulating anything when the configuration is invalid or the
/// signals are not aligned one-to-one with the bars.
pub fn run_backtest(
    series: &PriceSeries,
    signals: &[SignalPoint],
    config: &BacktestConfig,
) -> Result<BacktestResult, TwtraderError> {
    config.validate()?;
    check_alignment(series, signals)?;

    let execution = &config.execution;
    let bars = series.bars();
    let last = bars.len() - 1;

    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut pending: Option<SignalPoint> = None;
    let mut skipped_entries = 0usize;

    tracing::debug!(
        symbol = series.symbol(),
        bars = bars.len(),
        fill_policy = %execution.fill_policy,
        "starting backtest"
    );

    for (i, (bar, point)) in bars.iter().zip(signals).enumerate() {
        if let Some(order) = pending.take() {
            if !execute(&mut portfolio, &order, bar.open, bar.date, execution) {
                skipped_entries += 1;
            }
        }

        let stopped = check_stop_loss(&mut portfolio, bar, execution);

        if !stopped {
            match execution.fill_policy {
                FillPolicy::SameClose => {
                    // a final-bar entry would only be liquidated at the same close
                    let entry_on_last = i == last && point.signal == Signal::Buy;
                    if !entry_on_last
                        && !execute(&mut portfolio, point, bar.close, bar.date, execution)
                    {
                        skipped_entries += 1;
                    }
                }
                FillPolicy::NextOpen => {
                    if point.signal != Signal::Hold && i < last {
                        pending = Some(*point);
                    }
                }
            }
        }

        if i == last {
            exit_position(
                &mut portfolio,
                bar.close,
                bar.date,
                ExitReason::EndOfData,
                execution,
            );
        }

        portfolio.record_equity(bar.date, bar.close);
    }

    tracing::debug!(
        symbol = series.symbol(),
        trades = portfolio.trades.len(),
        final_cash = portfolio.cash,
        "backtest finished"
    );

    Ok(BacktestResult {
        symbol: series.symbol().to_string(),
        portfolio,
        skipped_entries,
    })
}

fn check_alignment(series: &PriceSeries, signals: &[SignalPoint]) -> Result<(), TwtraderError> {
    if signals.len() != series.len() {
        return Err(TwtraderError::data_integrity(
            series.symbol(),
            format!(
                "{} signals for {} bars",
                signals.len(),
                series.len()
            ),
        ));
    }
    if let Some((bar, point)) = series
        .bars()
        .iter()
        .zip(signals)
        .find(|(bar, point)| bar.date != point.date)
    {
        return Err(TwtraderError::data_integrity(
            series.symbol(),
            format!("signal dated {} aligned with bar {}", point.date, bar.date),
        ));
    }
    Ok(())
}

/// Close the position at its stop price when the bar's low reaches it.
fn check_stop_loss(portfolio: &mut Portfolio, bar: &OhlcvBar, execution: &ExecutionConfig) -> bool {
    let stop = match &portfolio.position {
        Some(pos) if pos.should_stop_loss(bar.low) => pos.stop_loss,
        _ => None,
    };
    match stop {
        Some(price) => {
            exit_position(portfolio, price, bar.date, ExitReason::StopLoss, execution);
            true
        }
        None => false,
    }
}

/// Act on a signal at `price`. Returns false for a Buy that could not be filled.
fn execute(
    portfolio: &mut Portfolio,
    point: &SignalPoint,
    price: f64,
    date: NaiveDate,
    execution: &ExecutionConfig,
) -> bool {
    match (point.signal, portfolio.is_long()) {
        (Signal::Sell, true) => {
            exit_position(portfolio, price, date, ExitReason::Signal, execution);
            true
        }
        (Signal::Buy, false) => {
            match enter_long(portfolio, price, date, point.stop_distance, execution) {
                EntryResult::Entered { .. } => true,
                EntryResult::InsufficientCapital => {
                    tracing::debug!(%date, price, cash = portfolio.cash, "buy skipped: insufficient cash");
                    false
                }
            }
        }
        _ => true,
    }
}
