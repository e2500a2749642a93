//! Configuration validation.
//!
//! Turns raw `[backtest]`, `[strategy]` and `[optimize]` values from a
//! [`ConfigPort`] into validated domain types before any run starts.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::TwtraderError;
use crate::domain::execution::{ExecutionConfig, FillPolicy};
use crate::domain::optimizer::ParamGrid;
use crate::domain::strategy::{MeanReversionParams, MomentumParams, Strategy};
use crate::ports::config_port::ConfigPort;

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TwtraderError> {
    let defaults = BacktestConfig::default();

    let fill_policy = match config.get_string("backtest", "fill_policy") {
        Some(value) => value
            .parse::<FillPolicy>()
            .map_err(|reason| TwtraderError::configuration("backtest", "fill_policy", reason))?,
        None => FillPolicy::default(),
    };

    let backtest = BacktestConfig {
        initial_capital: read_f64(config, "backtest", "initial_cash", defaults.initial_capital)?,
        execution: ExecutionConfig {
            commission_rate: read_f64(config, "backtest", "commission_rate", 0.0)?,
            slippage_rate: read_f64(config, "backtest", "slippage_rate", 0.0)?,
            fill_policy,
        },
        risk_free_rate: read_f64(config, "backtest", "risk_free_rate", defaults.risk_free_rate)?,
    };
    backtest.validate()?;
    Ok(backtest)
}

pub fn build_strategy(config: &dyn ConfigPort) -> Result<Strategy, TwtraderError> {
    let strategy = match strategy_kind(config)?.as_str() {
        "momentum" => Strategy::Momentum(build_momentum_params(config)?),
        _ => Strategy::MeanReversion(build_mean_reversion_params(config)?),
    };
    strategy.validate()?;
    Ok(strategy)
}

/// Momentum windows from `[strategy]`, whatever its `kind`.
pub fn build_momentum_params(config: &dyn ConfigPort) -> Result<MomentumParams, TwtraderError> {
    let d = MomentumParams::default();
    let params = MomentumParams {
        fast_window: read_usize(config, "strategy", "fast_window", d.fast_window)?,
        slow_window: read_usize(config, "strategy", "slow_window", d.slow_window)?,
    };
    params.validate()?;
    Ok(params)
}

/// Mean-reversion levels from `[strategy]`, whatever its `kind`.
pub fn build_mean_reversion_params(
    config: &dyn ConfigPort,
) -> Result<MeanReversionParams, TwtraderError> {
    let d = MeanReversionParams::default();
    let params = MeanReversionParams {
        rsi_window: read_usize(config, "strategy", "rsi_window", d.rsi_window)?,
        oversold: read_f64(config, "strategy", "oversold", d.oversold)?,
        overbought: read_f64(config, "strategy", "overbought", d.overbought)?,
        atr_window: read_usize(config, "strategy", "atr_window", d.atr_window)?,
        stop_multiple: read_f64(config, "strategy", "stop_multiple", d.stop_multiple)?,
    };
    params.validate()?;
    Ok(params)
}

/// Grid for the `[strategy] kind`; a list missing from `[optimize]` keeps
/// the built-in values for that parameter.
pub fn build_param_grid(config: &dyn ConfigPort) -> Result<ParamGrid, TwtraderError> {
    let mut grid = match strategy_kind(config)?.as_str() {
        "momentum" => ParamGrid::momentum_default(),
        _ => ParamGrid::mean_reversion_default(),
    };
    match &mut grid {
        ParamGrid::Momentum {
            fast_windows,
            slow_windows,
        } => {
            override_list(config, "fast_windows", fast_windows)?;
            override_list(config, "slow_windows", slow_windows)?;
        }
        ParamGrid::MeanReversion {
            rsi_windows,
            oversold_levels,
            overbought_levels,
            atr_windows,
            stop_multiples,
        } => {
            override_list(config, "rsi_windows", rsi_windows)?;
            override_list(config, "oversold_levels", oversold_levels)?;
            override_list(config, "overbought_levels", overbought_levels)?;
            override_list(config, "atr_windows", atr_windows)?;
            override_list(config, "stop_multiples", stop_multiples)?;
        }
    }
    Ok(grid)
}

/// `momentum` or `mean_reversion`; defaults to momentum.
fn strategy_kind(config: &dyn ConfigPort) -> Result<String, TwtraderError> {
    let kind = config
        .get_string("strategy", "kind")
        .map(|k| k.trim().to_lowercase().replace('-', "_"))
        .unwrap_or_else(|| "momentum".to_string());
    match kind.as_str() {
        "momentum" | "mean_reversion" => Ok(kind),
        other => Err(TwtraderError::configuration(
            "strategy",
            "kind",
            format!("unknown strategy '{other}', expected momentum or mean_reversion"),
        )),
    }
}

fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TwtraderError> {
    read_parsed(config, section, key, default)
}

fn read_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, TwtraderError> {
    read_parsed(config, section, key, default)
}

fn read_parsed<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, TwtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            TwtraderError::configuration(section, key, format!("'{}' is not a valid number", raw.trim()))
        }),
    }
}

/// Replace `values` with the comma-separated list under `[optimize] key`.
fn override_list<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    key: &str,
    values: &mut Vec<T>,
) -> Result<(), TwtraderError> {
    let Some(raw) = config.get_string("optimize", key) else {
        return Ok(());
    };
    let parsed = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| {
                TwtraderError::configuration("optimize", key, format!("'{s}' is not a valid number"))
            })
        })
        .collect::<Result<Vec<T>, _>>()?;
    if parsed.is_empty() {
        return Err(TwtraderError::configuration("optimize", key, "list is empty"));
    }
    *values = parsed;
    Ok(())
}
