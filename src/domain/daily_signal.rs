//! Daily signal snapshot across both strategies.
//!
//! For each symbol, runs Momentum and MeanReversion over the full history and
//! reports the last bar: its close, each strategy's signal with the indicator
//! values behind it, and one combined recommendation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

use super::error::TwtraderError;
use super::indicator::{calculate_atr, calculate_rsi, calculate_sma};
use super::price_series::PriceSeries;
use super::signal::{Signal, SignalPoint};
use super::strategy::{MeanReversionParams, MomentumParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumSnapshot {
    pub signal: Signal,
    /// Whether the strategy holds a position after the last bar.
    pub long: bool,
    pub fast_window: usize,
    pub slow_window: usize,
    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReversionSnapshot {
    pub signal: Signal,
    pub long: bool,
    pub rsi_window: usize,
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
    pub stop_distance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySignal {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub momentum: MomentumSnapshot,
    pub mean_reversion: MeanReversionSnapshot,
    pub recommendation: Signal,
}

/// Buy if either strategy buys, else Sell if either sells, else Hold.
pub fn combine(momentum: Signal, mean_reversion: Signal) -> Signal {
    if momentum == Signal::Buy || mean_reversion == Signal::Buy {
        Signal::Buy
    } else if momentum == Signal::Sell || mean_reversion == Signal::Sell {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

/// Long after the last bar when the most recent non-Hold signal is a Buy.
fn ends_long(signals: &[SignalPoint]) -> bool {
    signals
        .iter()
        .rev()
        .find(|p| p.signal != Signal::Hold)
        .is_some_and(|p| p.signal == Signal::Buy)
}

pub fn daily_signal(
    series: &PriceSeries,
    momentum: &MomentumParams,
    mean_reversion: &MeanReversionParams,
) -> DailySignal {
    let bars = series.bars();
    let last = bars.len() - 1;
    let bar = &bars[last];

    let momentum_signals = momentum.generate_signals(bars);
    let reversion_signals = mean_reversion.generate_signals(bars);
    let momentum_point = momentum_signals[last];
    let reversion_point = reversion_signals[last];

    DailySignal {
        symbol: series.symbol().to_string(),
        date: bar.date,
        close: bar.close,
        momentum: MomentumSnapshot {
            signal: momentum_point.signal,
            long: ends_long(&momentum_signals),
            fast_window: momentum.fast_window,
            slow_window: momentum.slow_window,
            sma_fast: calculate_sma(bars, momentum.fast_window).value_at(last),
            sma_slow: calculate_sma(bars, momentum.slow_window).value_at(last),
        },
        mean_reversion: MeanReversionSnapshot {
            signal: reversion_point.signal,
            long: ends_long(&reversion_signals),
            rsi_window: mean_reversion.rsi_window,
            rsi: calculate_rsi(bars, mean_reversion.rsi_window).value_at(last),
            atr: calculate_atr(bars, mean_reversion.atr_window).value_at(last),
            stop_distance: reversion_point.stop_distance,
        },
        recommendation: combine(momentum_point.signal, reversion_point.signal),
    }
}

/// A symbol left out of a [`DailySignalReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySignalReport {
    /// Keyed by symbol.
    pub signals: BTreeMap<String, DailySignal>,
    pub skipped: Vec<SkippedSymbol>,
}

impl DailySignalReport {
    pub fn insert(&mut self, signal: DailySignal) {
        self.signals.insert(signal.symbol.clone(), signal);
    }

    pub fn skip(&mut self, symbol: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(symbol, "skipped: {reason}");
        self.skipped.push(SkippedSymbol {
            symbol: symbol.to_string(),
            reason,
        });
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), TwtraderError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
