//! Technical indicator implementations.
//!
//! This module provides types for representing indicator series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorType`: Indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values aligned with its bars
//!
//! Every series has exactly one point per input bar. Points inside the
//! warm-up window carry `None` rather than a placeholder number.

pub mod atr;
pub mod rsi;
pub mod sma;

pub use atr::calculate_atr;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use chrono::NaiveDate;
use std::fmt;

use crate::domain::error::InsufficientHistory;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Rsi(usize),
    Atr(usize),
}

impl IndicatorType {
    /// Number of bars needed before the first defined value.
    pub fn required_bars(&self) -> usize {
        match self {
            IndicatorType::Sma(period) | IndicatorType::Atr(period) => *period,
            // one extra bar: the first price change needs a previous close
            IndicatorType::Rsi(period) => period + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at bar `index`, `None` inside the warm-up window or out of range.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(|p| p.value)
    }

    /// Index of the first defined value, if any.
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(|p| p.value.is_some())
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
        }
    }
}

/// Report when `available` bars cannot cover the indicator's warm-up.
pub fn check_history(
    indicator_type: IndicatorType,
    available: usize,
) -> Option<InsufficientHistory> {
    let required = indicator_type.required_bars();
    if required > available {
        Some(InsufficientHistory {
            indicator: indicator_type.to_string(),
            required,
            available,
        })
    } else {
        None
    }
}

/// All-undefined series, one point per date.
pub(crate) fn undefined_series(
    indicator_type: IndicatorType,
    dates: impl Iterator<Item = NaiveDate>,
) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type,
        values: dates
            .map(|date| IndicatorPoint { date, value: None })
            .collect(),
    }
}
