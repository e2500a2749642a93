//! Portfolio state and equity tracking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::position::{Position, Trade};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub cash: f64,
    pub position_value: f64,
    pub equity: f64,
}

/// Cash, the single open position, and the append-only ledgers.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub position: Option<Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn is_long(&self) -> bool {
        self.position.is_some()
    }

    pub fn open_position(&mut self, position: Position) {
        debug_assert!(self.position.is_none(), "pyramiding is not supported");
        self.position = Some(position);
    }

    pub fn take_position(&mut self) -> Option<Position> {
        self.position.take()
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn position_value(&self, price: f64) -> f64 {
        self.position
            .as_ref()
            .map(|pos| pos.market_value(price))
            .unwrap_or(0.0)
    }

    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash + self.position_value(price)
    }

    /// Marks the open position to `price` and appends the equity point.
    pub fn record_equity(&mut self, date: NaiveDate, price: f64) {
        let position_value = self.position_value(price);
        self.equity_curve.push(EquityPoint {
            date,
            cash: self.cash,
            position_value,
            equity: self.cash + position_value,
        });
    }
}
