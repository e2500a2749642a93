//! RSI mean-reversion strategy with an ATR stop.
//!
//! Buy when RSI crosses below the oversold level while flat. While long,
//! sell when RSI crosses above the overbought level or when the bar's low
//! breaches `close_at_buy - stop_multiple * ATR_at_buy`.
//!
//! The backtester anchors its own stop at the actual fill price. After a gap
//! or slippage it can stop the position out while this fold still counts as
//! long; further oversold Buys are then ignored until this fold's own Sell.

use serde::{Deserialize, Serialize};

use super::{crossing, Cross};
use crate::domain::error::TwtraderError;
use crate::domain::indicator::{calculate_atr, calculate_rsi};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{SignalPoint, Stance};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanReversionParams {
    pub rsi_window: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub atr_window: usize,
    /// ATR multiple for the stop; 0 disables it.
    pub stop_multiple: f64,
}

impl Default for MeanReversionParams {
    fn default() -> Self {
        MeanReversionParams {
            rsi_window: 14,
            oversold: 30.0,
            overbought: 70.0,
            atr_window: 14,
            stop_multiple: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FoldState {
    stance: Stance,
    stop_level: Option<f64>,
}

impl MeanReversionParams {
    pub fn validate(&self) -> Result<(), TwtraderError> {
        if self.rsi_window == 0 {
            return Err(TwtraderError::configuration(
                "strategy",
                "rsi_window",
                "rsi_window must be positive",
            ));
        }
        if !(self.oversold > 0.0 && self.oversold < 100.0) {
            return Err(TwtraderError::configuration(
                "strategy",
                "oversold",
                "oversold must be between 0 and 100 (exclusive)",
            ));
        }
        if !(self.overbought > self.oversold && self.overbought < 100.0) {
            return Err(TwtraderError::configuration(
                "strategy",
                "overbought",
                "overbought must be above oversold and below 100",
            ));
        }
        if self.atr_window == 0 {
            return Err(TwtraderError::configuration(
                "strategy",
                "atr_window",
                "atr_window must be positive",
            ));
        }
        if !(self.stop_multiple >= 0.0 && self.stop_multiple.is_finite()) {
            return Err(TwtraderError::configuration(
                "strategy",
                "stop_multiple",
                "stop_multiple must be non-negative",
            ));
        }
        Ok(())
    }

    pub fn generate_signals(&self, bars: &[OhlcvBar]) -> Vec<SignalPoint> {
        let rsi = calculate_rsi(bars, self.rsi_window);
        let atr = calculate_atr(bars, self.atr_window);

        let mut state = FoldState::default();
        let mut signals = Vec::with_capacity(bars.len());

        for (i, bar) in bars.iter().enumerate() {
            let prev_rsi = i.checked_sub(1).and_then(|p| rsi.value_at(p));
            let rsi_cross = |level: f64| match (prev_rsi, rsi.value_at(i)) {
                (Some(prev), Some(curr)) => crossing(prev, level, curr, level),
                _ => None,
            };

            let point = match state.stance {
                Stance::Long => {
                    let stopped = state.stop_level.is_some_and(|stop| bar.low <= stop);
                    if stopped || rsi_cross(self.overbought) == Some(Cross::Above) {
                        state = FoldState::default();
                        SignalPoint::sell(bar.date)
                    } else {
                        SignalPoint::hold(bar.date)
                    }
                }
                Stance::Flat => {
                    if rsi_cross(self.oversold) == Some(Cross::Below) {
                        let stop_distance = self.stop_distance(atr.value_at(i));
                        state = FoldState {
                            stance: Stance::Long,
                            stop_level: stop_distance.map(|d| bar.close - d),
                        };
                        SignalPoint::buy(bar.date, stop_distance)
                    } else {
                        SignalPoint::hold(bar.date)
                    }
                }
            };
            signals.push(point);
        }

        signals
    }

    fn stop_distance(&self, atr: Option<f64>) -> Option<f64> {
        if self.stop_multiple > 0.0 {
            atr.map(|a| a * self.stop_multiple)
        } else {
            None
        }
    }
}
