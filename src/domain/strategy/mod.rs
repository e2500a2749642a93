//! Trading strategies.
//!
//! A [`Strategy`] is a tagged variant over small parameter structs. Each
//! variant is a pure function from a [`PriceSeries`] to one [`SignalPoint`]
//! per bar; the long/flat stance is a local fold accumulator, so concurrent
//! calls on shared inputs never interfere.

pub mod mean_reversion;
pub mod momentum;

pub use mean_reversion::MeanReversionParams;
pub use momentum::MomentumParams;

use serde::{Deserialize, Serialize};

use crate::domain::error::{InsufficientHistory, TwtraderError};
use crate::domain::indicator::{check_history, IndicatorType};
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::SignalPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    Momentum(MomentumParams),
    MeanReversion(MeanReversionParams),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Momentum(_) => "Momentum",
            Strategy::MeanReversion(_) => "MeanReversion",
        }
    }

    pub fn validate(&self) -> Result<(), TwtraderError> {
        match self {
            Strategy::Momentum(params) => params.validate(),
            Strategy::MeanReversion(params) => params.validate(),
        }
    }

    pub fn indicators(&self) -> Vec<IndicatorType> {
        match self {
            Strategy::Momentum(params) => vec![
                IndicatorType::Sma(params.fast_window),
                IndicatorType::Sma(params.slow_window),
            ],
            Strategy::MeanReversion(params) => vec![
                IndicatorType::Rsi(params.rsi_window),
                IndicatorType::Atr(params.atr_window),
            ],
        }
    }

    /// Indicators whose warm-up is longer than `available` bars.
    pub fn history_warnings(&self, available: usize) -> Vec<InsufficientHistory> {
        self.indicators()
            .into_iter()
            .filter_map(|indicator| check_history(indicator, available))
            .collect()
    }

    /// Log each [`history_warnings`](Self::history_warnings) entry for `series` at warn level.
    pub fn warn_short_history(&self, series: &PriceSeries) {
        for warning in self.history_warnings(series.len()) {
            tracing::warn!(symbol = series.symbol(), "{warning}");
        }
    }

    /// One signal per bar of `series`, in date order.
    pub fn generate_signals(&self, series: &PriceSeries) -> Vec<SignalPoint> {
        for warning in self.history_warnings(series.len()) {
            tracing::debug!(symbol = series.symbol(), "{warning}");
        }

        match self {
            Strategy::Momentum(params) => params.generate_signals(series.bars()),
            Strategy::MeanReversion(params) => params.generate_signals(series.bars()),
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Momentum(MomentumParams::default())
    }
}

impl From<MomentumParams> for Strategy {
    fn from(params: MomentumParams) -> Self {
        Strategy::Momentum(params)
    }
}

impl From<MeanReversionParams> for Strategy {
    fn from(params: MeanReversionParams) -> Self {
        Strategy::MeanReversion(params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cross {
    Above,
    Below,
}

/// Strict crossing of `a` over `b` between two consecutive bars.
///
/// Touching on the previous bar counts as "not yet crossed"; touching on the
/// current bar does not count as a cross.
pub(crate) fn crossing(prev_a: f64, prev_b: f64, a: f64, b: f64) -> Option<Cross> {
    if prev_a <= prev_b && a > b {
        Some(Cross::Above)
    } else if prev_a >= prev_b && a < b {
        Some(Cross::Below)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_detects_direction() {
        assert_eq!(crossing(1.0, 2.0, 3.0, 2.0), Some(Cross::Above));
        assert_eq!(crossing(3.0, 2.0, 1.0, 2.0), Some(Cross::Below));
        assert_eq!(crossing(2.0, 2.0, 2.5, 2.0), Some(Cross::Above));
    }

    #[test]
    fn crossing_ignores_persistent_ordering() {
        assert_eq!(crossing(3.0, 2.0, 4.0, 2.0), None);
        assert_eq!(crossing(1.0, 2.0, 0.5, 2.0), None);
        assert_eq!(crossing(1.0, 2.0, 2.0, 2.0), None);
    }

    #[test]
    fn strategy_names_and_indicators() {
        let momentum = Strategy::default();
        assert_eq!(momentum.name(), "Momentum");
        assert_eq!(
            momentum.indicators(),
            vec![IndicatorType::Sma(20), IndicatorType::Sma(60)]
        );

        let reversion = Strategy::from(MeanReversionParams::default());
        assert_eq!(reversion.name(), "MeanReversion");
        assert_eq!(
            reversion.indicators(),
            vec![IndicatorType::Rsi(14), IndicatorType::Atr(14)]
        );
    }

    #[test]
    fn history_warnings_for_short_series() {
        let strategy = Strategy::default();
        let warnings = strategy.history_warnings(30);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].indicator, "SMA(60)");

        assert!(strategy.history_warnings(60).is_empty());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_string(&Strategy::default()).unwrap();
        assert!(json.contains("\"kind\":\"momentum\""));
        assert!(json.contains("\"fast_window\":20"));
    }
}
