//! Grid search over strategy parameters.
//!
//! Every candidate is an independent backtest over the same borrowed
//! [`PriceSeries`], so candidates run in parallel on the rayon pool and
//! share nothing mutable.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;

use super::backtest::{run_backtest, BacktestConfig};
use super::error::{InsufficientHistory, TwtraderError};
use super::metrics::PerformanceMetrics;
use super::price_series::PriceSeries;
use super::strategy::{MeanReversionParams, MomentumParams, Strategy};

/// Candidate values for each parameter of one strategy kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamGrid {
    Momentum {
        fast_windows: Vec<usize>,
        slow_windows: Vec<usize>,
    },
    MeanReversion {
        rsi_windows: Vec<usize>,
        oversold_levels: Vec<f64>,
        overbought_levels: Vec<f64>,
        atr_windows: Vec<usize>,
        stop_multiples: Vec<f64>,
    },
}

impl ParamGrid {
    pub fn momentum_default() -> Self {
        ParamGrid::Momentum {
            fast_windows: vec![10, 20, 30],
            slow_windows: vec![50, 60, 100],
        }
    }

    pub fn mean_reversion_default() -> Self {
        ParamGrid::MeanReversion {
            rsi_windows: vec![7, 14, 21],
            oversold_levels: vec![20.0, 30.0],
            overbought_levels: vec![70.0, 80.0],
            atr_windows: vec![14],
            stop_multiples: vec![1.5, 2.0, 3.0],
        }
    }

    /// Number of combinations before invalid ones are dropped.
    pub fn size(&self) -> usize {
        match self {
            ParamGrid::Momentum {
                fast_windows,
                slow_windows,
            } => fast_windows.len() * slow_windows.len(),
            ParamGrid::MeanReversion {
                rsi_windows,
                oversold_levels,
                overbought_levels,
                atr_windows,
                stop_multiples,
            } => {
                rsi_windows.len()
                    * oversold_levels.len()
                    * overbought_levels.len()
                    * atr_windows.len()
                    * stop_multiples.len()
            }
        }
    }

    /// All valid strategies in the grid, in nested-loop order.
    pub fn candidates(&self) -> Vec<Strategy> {
        let mut all = Vec::with_capacity(self.size());
        match self {
            ParamGrid::Momentum {
                fast_windows,
                slow_windows,
            } => {
                for &fast_window in fast_windows {
                    for &slow_window in slow_windows {
                        all.push(Strategy::from(MomentumParams {
                            fast_window,
                            slow_window,
                        }));
                    }
                }
            }
            ParamGrid::MeanReversion {
                rsi_windows,
                oversold_levels,
                overbought_levels,
                atr_windows,
                stop_multiples,
            } => {
                for &rsi_window in rsi_windows {
                    for &oversold in oversold_levels {
                        for &overbought in overbought_levels {
                            for &atr_window in atr_windows {
                                for &stop_multiple in stop_multiples {
                                    all.push(Strategy::from(MeanReversionParams {
                                        rsi_window,
                                        oversold,
                                        overbought,
                                        atr_window,
                                        stop_multiple,
                                    }));
                                }
                            }
                        }
                    }
                }
            }
        }

        all.into_iter()
            .filter(|strategy| match strategy.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(?strategy, "skipping candidate: {e}");
                    false
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRun {
    /// Position of the candidate in grid order.
    pub candidate: usize,
    pub strategy: Strategy,
    pub metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub symbol: String,
    /// Sorted by Sharpe ratio, best first; ties keep grid order.
    pub runs: Vec<OptimizationRun>,
}

impl OptimizationReport {
    pub fn best(&self) -> Option<&OptimizationRun> {
        self.runs.first()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), TwtraderError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Backtest every valid candidate of `grid` and rank the results.
pub fn optimize(
    series: &PriceSeries,
    grid: &ParamGrid,
    config: &BacktestConfig,
) -> Result<OptimizationReport, TwtraderError> {
    config.validate()?;

    let candidates = grid.candidates();
    if candidates.is_empty() {
        return Err(TwtraderError::configuration(
            "optimize",
            "grid",
            "no valid parameter combinations",
        ));
    }

    for warning in distinct_history_warnings(&candidates, series.len()) {
        tracing::warn!(symbol = series.symbol(), "{warning}");
    }

    tracing::info!(
        symbol = series.symbol(),
        candidates = candidates.len(),
        skipped = grid.size() - candidates.len(),
        "optimizing"
    );

    let mut runs = candidates
        .into_par_iter()
        .enumerate()
        .map(|(candidate, strategy)| {
            let signals = strategy.generate_signals(series);
            let result = run_backtest(series, &signals, config)?;
            let metrics = PerformanceMetrics::compute(
                result.equity_curve(),
                result.trades(),
                config.risk_free_rate,
            );
            Ok(OptimizationRun {
                candidate,
                strategy,
                metrics,
            })
        })
        .collect::<Result<Vec<_>, TwtraderError>>()?;

    runs.sort_by(|a, b| {
        b.metrics
            .sharpe_ratio
            .total_cmp(&a.metrics.sharpe_ratio)
            .then(a.candidate.cmp(&b.candidate))
    });

    if let Some(best) = runs.first() {
        tracing::info!(
            symbol = series.symbol(),
            strategy = ?best.strategy,
            sharpe = best.metrics.sharpe_ratio,
            "best candidate"
        );
    }

    Ok(OptimizationReport {
        symbol: series.symbol().to_string(),
        runs,
    })
}

/// History warnings across all candidates, one per indicator, in first-seen order.
fn distinct_history_warnings(candidates: &[Strategy], available: usize) -> Vec<InsufficientHistory> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .flat_map(|c| c.history_warnings(available))
        .filter(|w| seen.insert(w.indicator.clone()))
        .collect()
}
