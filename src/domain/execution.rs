//! Trade execution and fill simulation.
//!
//! Implements entry/exit logic with slippage, whole-share quantity sizing
//! and commissions for a single long-only position.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::portfolio::Portfolio;
use super::position::{ExitReason, Position, Trade};

/// Which price a signal executes at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Next bar's open. Avoids lookahead bias.
    #[default]
    NextOpen,
    /// The signal bar's own close.
    SameClose,
}

impl fmt::Display for FillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillPolicy::NextOpen => write!(f, "next_open"),
            FillPolicy::SameClose => write!(f, "same_close"),
        }
    }
}

impl FromStr for FillPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "next_open" => Ok(FillPolicy::NextOpen),
            "same_close" => Ok(FillPolicy::SameClose),
            other => Err(format!(
                "unknown fill policy '{}', expected next_open or same_close",
                other
            )),
        }
    }
}

/// Configuration for backtest execution parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Fraction of notional charged per fill.
    pub commission_rate: f64,
    /// Fraction by which fills move against the trader.
    pub slippage_rate: f64,
    pub fill_policy: FillPolicy,
}

/// Commission for one fill: trade_value * commission_rate.
pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    trade_value * config.commission_rate
}

/// Buy fill: market_price * (1 + slippage_rate)
pub fn apply_slippage_entry(market_price: f64, slippage_rate: f64) -> f64 {
    market_price * (1.0 + slippage_rate)
}

/// Sell fill: market_price * (1 - slippage_rate)
pub fn apply_slippage_exit(market_price: f64, slippage_rate: f64) -> f64 {
    market_price * (1.0 - slippage_rate)
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: u64,
        execution_price: f64,
        cost: f64,
        commission: f64,
    },
    InsufficientCapital,
}

/// Enter a long position with all available cash.
///
/// 1. Apply slippage to execution price
/// 2. quantity = floor(cash / (price * (1 + commission_rate))), whole shares only
/// 3. If quantity == 0, return InsufficientCapital and leave the portfolio untouched
/// 4. Deduct cost + commission from cash
/// 5. Stop-loss sits `stop_distance` below the execution price
pub fn enter_long(
    portfolio: &mut Portfolio,
    market_price: f64,
    date: NaiveDate,
    stop_distance: Option<f64>,
    config: &ExecutionConfig,
) -> EntryResult {
    let execution_price = apply_slippage_entry(market_price, config.slippage_rate);
    if execution_price <= 0.0 {
        return EntryResult::InsufficientCapital;
    }

    let unit_cost = execution_price * (1.0 + config.commission_rate);
    let quantity = (portfolio.cash / unit_cost).floor();
    if quantity < 1.0 {
        return EntryResult::InsufficientCapital;
    }
    let quantity = quantity as u64;

    let cost = quantity as f64 * execution_price;
    let commission = calculate_commission(cost, config);
    let total_cost = cost + commission;

    if total_cost > portfolio.cash {
        return EntryResult::InsufficientCapital;
    }

    portfolio.cash -= total_cost;

    let stop_loss = stop_distance
        .map(|d| execution_price - d)
        .filter(|&stop| stop > 0.0);

    portfolio.open_position(Position {
        quantity,
        entry_price: execution_price,
        entry_date: date,
        stop_loss,
        entry_commission: commission,
    });

    EntryResult::Entered {
        quantity,
        execution_price,
        cost,
        commission,
    }
}

/// Result of an exit.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub quantity: u64,
    pub exit_price: f64,
    pub exit_value: f64,
    pub exit_commission: f64,
    pub pnl: f64,
}

/// Close the open position, if any, and append its trade to the ledger.
///
/// PnL is net of both the entry and exit commissions.
pub fn exit_position(
    portfolio: &mut Portfolio,
    market_price: f64,
    exit_date: NaiveDate,
    exit_reason: ExitReason,
    config: &ExecutionConfig,
) -> Option<ExitResult> {
    let position = portfolio.take_position()?;

    let exit_price = apply_slippage_exit(market_price, config.slippage_rate);
    let exit_value = position.quantity as f64 * exit_price;
    let exit_commission = calculate_commission(exit_value, config);

    let pnl = position.unrealized_pnl(exit_price) - position.entry_commission - exit_commission;

    portfolio.cash += exit_value - exit_commission;

    portfolio.record_trade(Trade {
        entry_date: position.entry_date,
        entry_price: position.entry_price,
        exit_date,
        exit_price,
        quantity: position.quantity,
        pnl,
        exit_reason,
    });

    Some(ExitResult {
        quantity: position.quantity,
        exit_price,
        exit_value,
        exit_commission,
        pnl,
    })
}
