//! SMA crossover momentum strategy.
//!
//! Buy on a golden cross (fast SMA crosses above slow SMA) while flat,
//! sell on a death cross while long. Crossings are detected between
//! consecutive bars, so a persisting "fast > slow" never re-fires.

use serde::{Deserialize, Serialize};

use super::{crossing, Cross};
use crate::domain::error::TwtraderError;
use crate::domain::indicator::calculate_sma;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{Signal, SignalPoint, Stance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentumParams {
    pub fast_window: usize,
    pub slow_window: usize,
}

impl Default for MomentumParams {
    fn default() -> Self {
        MomentumParams {
            fast_window: 20,
            slow_window: 60,
        }
    }
}

impl MomentumParams {
    pub fn validate(&self) -> Result<(), TwtraderError> {
        if self.fast_window == 0 {
            return Err(TwtraderError::configuration(
                "strategy",
                "fast_window",
                "fast_window must be positive",
            ));
        }
        if self.slow_window <= self.fast_window {
            return Err(TwtraderError::configuration(
                "strategy",
                "slow_window",
                format!(
                    "slow_window ({}) must be greater than fast_window ({})",
                    self.slow_window, self.fast_window
                ),
            ));
        }
        Ok(())
    }

    pub fn generate_signals(&self, bars: &[OhlcvBar]) -> Vec<SignalPoint> {
        let fast = calculate_sma(bars, self.fast_window);
        let slow = calculate_sma(bars, self.slow_window);

        let mut stance = Stance::Flat;
        let mut signals = Vec::with_capacity(bars.len());

        for (i, bar) in bars.iter().enumerate() {
            let cross = match i.checked_sub(1) {
                Some(prev) => match (
                    fast.value_at(prev),
                    slow.value_at(prev),
                    fast.value_at(i),
                    slow.value_at(i),
                ) {
                    (Some(pf), Some(ps), Some(f), Some(s)) => crossing(pf, ps, f, s),
                    _ => None,
                },
                None => None,
            };

            let (next, signal) = step(stance, cross);
            stance = next;

            signals.push(match signal {
                Signal::Buy => SignalPoint::buy(bar.date, None),
                Signal::Sell => SignalPoint::sell(bar.date),
                Signal::Hold => SignalPoint::hold(bar.date),
            });
        }

        signals
    }
}

fn step(stance: Stance, cross: Option<Cross>) -> (Stance, Signal) {
    match (stance, cross) {
        (Stance::Flat, Some(Cross::Above)) => (Stance::Long, Signal::Buy),
        (Stance::Long, Some(Cross::Below)) => (Stance::Flat, Signal::Sell),
        (stance, _) => (stance, Signal::Hold),
    }
}
