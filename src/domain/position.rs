//! Open position and closed trade records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub quantity: u64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub stop_loss: Option<f64>,
    pub entry_commission: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }

    /// True when `low` reaches the stop-loss price.
    pub fn should_stop_loss(&self, low: f64) -> bool {
        self.stop_loss.is_some_and(|stop| low <= stop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "signal"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::EndOfData => write!(f, "end_of_data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub quantity: u64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    /// Calendar days between entry and exit.
    pub fn duration_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position() -> Position {
        Position {
            quantity: 100,
            entry_price: 50.0,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            stop_loss: Some(45.0),
            entry_commission: 0.0,
        }
    }

    #[test]
    fn market_value() {
        let pos = sample_position();
        assert!((pos.market_value(55.0) - 5500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl_profit_and_loss() {
        let pos = sample_position();
        assert!((pos.unrealized_pnl(55.0) - 500.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_pnl(45.0) - (-500.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn stop_loss_triggered() {
        let pos = sample_position();
        assert!(pos.should_stop_loss(44.0));
        assert!(pos.should_stop_loss(45.0));
        assert!(!pos.should_stop_loss(46.0));
    }

    #[test]
    fn stop_loss_disabled() {
        let pos = Position {
            stop_loss: None,
            ..sample_position()
        };
        assert!(!pos.should_stop_loss(0.0));
    }

    #[test]
    fn exit_reason_display() {
        assert_eq!(ExitReason::Signal.to_string(), "signal");
        assert_eq!(ExitReason::StopLoss.to_string(), "stop_loss");
        assert_eq!(ExitReason::EndOfData.to_string(), "end_of_data");
    }

    #[test]
    fn trade_duration() {
        let trade = Trade {
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            entry_price: 50.0,
            exit_date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            exit_price: 55.0,
            quantity: 100,
            pnl: 500.0,
            exit_reason: ExitReason::Signal,
        };
        assert_eq!(trade.duration_days(), 5);
    }
}
