//! Discrete per-bar trading signals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

/// A signal attached to one bar.
///
/// `stop_distance` is only meaningful on a Buy: the price distance below the
/// fill at which the resulting position is stopped out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub signal: Signal,
    pub stop_distance: Option<f64>,
}

impl SignalPoint {
    pub fn hold(date: NaiveDate) -> Self {
        Self {
            date,
            signal: Signal::Hold,
            stop_distance: None,
        }
    }

    pub fn buy(date: NaiveDate, stop_distance: Option<f64>) -> Self {
        Self {
            date,
            signal: Signal::Buy,
            stop_distance,
        }
    }

    pub fn sell(date: NaiveDate) -> Self {
        Self {
            date,
            signal: Signal::Sell,
            stop_distance: None,
        }
    }
}

/// Long/flat state threaded through signal generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stance {
    #[default]
    Flat,
    Long,
}
