//! Performance metrics and statistics.
//!
//! Everything here is a pure function of the equity curve and the trade
//! ledger; a year is 252 bars.

use serde::{Deserialize, Serialize};

use super::portfolio::EquityPoint;
use super::position::Trade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub max_drawdown: f64,
    /// Longest run of bars spent below the running peak.
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub annualized_volatility: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    /// Gross wins over gross losses; `None` when there are wins but no losses.
    pub profit_factor: Option<f64>,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Mean calendar days per trade.
    pub avg_trade_duration: f64,
    pub final_equity: f64,
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[EquityPoint], trades: &[Trade], risk_free_rate: f64) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();

        let growth = match (equity.first(), equity.last()) {
            (Some(&first), Some(&last)) if first > 0.0 => Some(last / first),
            _ => None,
        };
        let total_return = growth.map(|g| g - 1.0).unwrap_or(0.0);
        let cagr = match growth {
            Some(g) if g > 0.0 => g.powf(TRADING_DAYS_PER_YEAR / equity.len() as f64) - 1.0,
            _ => 0.0,
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&equity);

        let returns = daily_returns(&equity);
        let stdev = sample_stdev(&returns);
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&returns, stdev, daily_rf);
        let annualized_volatility = stdev * TRADING_DAYS_PER_YEAR.sqrt();

        let stats = TradeStats::from_trades(trades);

        PerformanceMetrics {
            total_return,
            cagr,
            max_drawdown,
            max_drawdown_duration,
            sharpe_ratio,
            sortino_ratio,
            annualized_volatility,
            win_rate: stats.win_rate(),
            total_trades: trades.len(),
            trades_won: stats.won,
            trades_lost: stats.lost,
            trades_breakeven: stats.breakeven,
            profit_factor: stats.profit_factor(),
            avg_win: ratio(stats.total_wins, stats.won),
            avg_loss: ratio(stats.total_losses, stats.lost),
            largest_win: stats.largest_win,
            largest_loss: stats.largest_loss,
            avg_trade_duration: ratio(stats.total_duration_days as f64, trades.len()),
            final_equity: equity.last().copied().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Default)]
struct TradeStats {
    won: usize,
    lost: usize,
    breakeven: usize,
    total_wins: f64,
    /// Absolute value.
    total_losses: f64,
    largest_win: f64,
    largest_loss: f64,
    total_duration_days: i64,
}

impl TradeStats {
    fn from_trades(trades: &[Trade]) -> Self {
        let mut stats = TradeStats::default();
        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                stats.won += 1;
                stats.total_wins += pnl;
                stats.largest_win = stats.largest_win.max(pnl);
            } else if pnl < 0.0 {
                stats.lost += 1;
                stats.total_losses += pnl.abs();
                stats.largest_loss = stats.largest_loss.max(pnl.abs());
            } else {
                stats.breakeven += 1;
            }
            stats.total_duration_days += trade.duration_days();
        }
        stats
    }

    fn win_rate(&self) -> f64 {
        ratio(self.won as f64, self.won + self.lost + self.breakeven)
    }

    fn profit_factor(&self) -> Option<f64> {
        if self.total_losses > 0.0 {
            Some(self.total_wins / self.total_losses)
        } else if self.total_wins > 0.0 {
            None
        } else {
            Some(0.0)
        }
    }
}

fn ratio(total: f64, count: usize) -> f64 {
    if count > 0 { total / count as f64 } else { 0.0 }
}

/// (max fractional drawdown, longest stretch of bars below the peak)
fn compute_drawdown(equity: &[f64]) -> (f64, usize) {
    let Some(&first) = equity.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for &value in equity {
        if value >= peak {
            peak = value;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

fn daily_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    ratio(values.iter().sum(), values.len())
}

/// Standard deviation with the n - 1 divisor; 0 below two samples.
fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn compute_risk_adjusted(returns: &[f64], stdev: f64, daily_rf: f64) -> (f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0);
    }

    let excess_return = mean(returns) - daily_rf;
    let annualize = TRADING_DAYS_PER_YEAR.sqrt();

    let sharpe = if stdev > 0.0 {
        excess_return / stdev * annualize
    } else {
        0.0
    };

    let downside_sq: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum();
    let downside_stdev = (downside_sq / (returns.len() - 1) as f64).sqrt();

    let sortino = if downside_stdev > 0.0 {
        excess_return / downside_stdev * annualize
    } else {
        0.0
    };

    (sharpe, sortino)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::ExitReason;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_equity_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                cash: v,
                position_value: 0.0,
                equity: v,
            })
            .collect()
    }

    fn make_trade(pnl: f64, days: i64) -> Trade {
        let entry_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Trade {
            entry_date,
            entry_price: 100.0,
            exit_date: entry_date + chrono::Duration::days(days),
            exit_price: 100.0 + pnl / 100.0,
            quantity: 100,
            pnl,
            exit_reason: ExitReason::Signal,
        }
    }

    fn compute(values: &[f64], trades: &[Trade]) -> PerformanceMetrics {
        PerformanceMetrics::compute(&make_equity_curve(values), trades, 0.0)
    }

    #[test]
    fn metrics_empty_curve() {
        let metrics = compute(&[], &[]);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.cagr, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.total_trades, 0);
    }

    #[test]
    fn metrics_single_bar() {
        let metrics = compute(&[100_000.0], &[]);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.cagr, 0.0);
        assert_eq!(metrics.annualized_volatility, 0.0);
        assert_eq!(metrics.final_equity, 100_000.0);
    }

    #[test]
    fn metrics_total_return() {
        assert_relative_eq!(compute(&[100_000.0, 110_000.0], &[]).total_return, 0.10);
        assert_relative_eq!(compute(&[100_000.0, 90_000.0], &[]).total_return, -0.10);
    }

    #[test]
    fn metrics_non_positive_first_equity() {
        let metrics = compute(&[0.0, 100.0], &[]);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.cagr, 0.0);
    }

    #[test]
    fn metrics_cagr_over_one_year() {
        let mut values = vec![100.0; 251];
        values.push(121.0);
        let metrics = compute(&values, &[]);
        assert_relative_eq!(metrics.cagr, 0.21, epsilon = 1e-9);

        let flat = compute(&[100.0; 252], &[]);
        assert_relative_eq!(flat.cagr, 0.0);
    }

    #[test]
    fn metrics_max_drawdown() {
        let metrics = compute(&[100.0, 120.0, 90.0, 110.0], &[]);
        assert_relative_eq!(metrics.max_drawdown, 0.25);

        let (dd, _) = compute_drawdown(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        assert_relative_eq!(dd, (110.0 - 80.0) / 110.0);
    }

    #[test]
    fn metrics_max_drawdown_duration() {
        let (_, duration) = compute_drawdown(&[100.0, 110.0, 100.0, 90.0, 85.0, 95.0, 120.0]);
        assert_eq!(duration, 4);
    }

    #[test]
    fn metrics_monotonic_curve_has_no_drawdown() {
        let metrics = compute(&[100.0, 101.0, 102.0, 103.0], &[]);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.max_drawdown_duration, 0);
    }

    #[test]
    fn metrics_sample_stdev_and_volatility() {
        // returns: +10 %, -10 %
        let metrics = compute(&[100.0, 110.0, 99.0], &[]);
        let stdev = sample_stdev(&[0.1, -0.1]);
        assert_relative_eq!(stdev, 0.02_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(
            metrics.annualized_volatility,
            stdev * 252.0_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn metrics_sharpe_matches_formula() {
        let values = [100.0, 102.0, 101.0, 104.0, 103.0, 107.0];
        let returns = daily_returns(&values);
        let expected = mean(&returns) / sample_stdev(&returns) * 252.0_f64.sqrt();

        let metrics = compute(&values, &[]);
        assert_relative_eq!(metrics.sharpe_ratio, expected, epsilon = 1e-12);
        assert!(metrics.sortino_ratio > 0.0);
    }

    #[test]
    fn metrics_risk_free_rate_lowers_sharpe() {
        let curve = make_equity_curve(&[100.0, 102.0, 101.0, 104.0, 103.0, 107.0]);
        let without = PerformanceMetrics::compute(&curve, &[], 0.0);
        let with = PerformanceMetrics::compute(&curve, &[], 0.05);
        assert!(with.sharpe_ratio < without.sharpe_ratio);
    }

    #[test]
    fn metrics_zero_volatility_sharpe_is_zero() {
        let metrics = compute(&[100.0, 100.0, 100.0], &[]);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.sortino_ratio, 0.0);
    }

    #[test]
    fn metrics_trade_stats_wins_and_losses() {
        let trades = vec![
            make_trade(100.0, 5),
            make_trade(-50.0, 3),
            make_trade(200.0, 10),
            make_trade(0.0, 1),
        ];
        let metrics = compute(&[100_000.0, 100_250.0], &trades);

        assert_eq!(metrics.total_trades, 4);
        assert_eq!(metrics.trades_won, 2);
        assert_eq!(metrics.trades_lost, 1);
        assert_eq!(metrics.trades_breakeven, 1);
        assert_relative_eq!(metrics.win_rate, 0.5);
    }

    #[test]
    fn metrics_profit_factor() {
        let trades = vec![make_trade(100.0, 5), make_trade(-50.0, 3), make_trade(200.0, 10)];
        let metrics = compute(&[100_000.0, 100_250.0], &trades);
        assert_relative_eq!(metrics.profit_factor.unwrap(), 6.0);

        let only_wins = compute(&[100.0, 101.0], &[make_trade(1.0, 1)]);
        assert_eq!(only_wins.profit_factor, None);
    }

    #[test]
    fn metrics_avg_and_largest() {
        let trades = vec![
            make_trade(100.0, 5),
            make_trade(-60.0, 3),
            make_trade(300.0, 10),
            make_trade(-40.0, 2),
        ];
        let metrics = compute(&[100_000.0, 100_300.0], &trades);

        assert_relative_eq!(metrics.avg_win, 200.0);
        assert_relative_eq!(metrics.avg_loss, 50.0);
        assert_relative_eq!(metrics.largest_win, 300.0);
        assert_relative_eq!(metrics.largest_loss, 60.0);
        assert_relative_eq!(metrics.avg_trade_duration, 5.0);
    }

    #[test]
    fn metrics_no_trades() {
        let metrics = compute(&[100_000.0, 110_000.0], &[]);

        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.profit_factor, Some(0.0));
        assert_eq!(metrics.avg_win, 0.0);
        assert_eq!(metrics.avg_loss, 0.0);
        assert_eq!(metrics.avg_trade_duration, 0.0);
        assert_relative_eq!(metrics.final_equity, 110_000.0);
    }
}
