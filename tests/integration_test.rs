//! End-to-end tests across indicators, strategies, the backtester and metrics.

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use proptest::strategy::Strategy as _;
use twtrader::domain::backtest::{run_backtest, run_strategy, BacktestConfig};
use twtrader::domain::execution::{ExecutionConfig, FillPolicy};
use twtrader::domain::indicator::{calculate_atr, calculate_rsi, calculate_sma};
use twtrader::domain::metrics::PerformanceMetrics;
use twtrader::domain::optimizer::{optimize, ParamGrid};
use twtrader::domain::position::ExitReason;
use twtrader::domain::signal::Signal;
use twtrader::domain::strategy::{MeanReversionParams, MomentumParams, Strategy};

fn momentum(fast_window: usize, slow_window: usize) -> Strategy {
    Strategy::Momentum(MomentumParams {
        fast_window,
        slow_window,
    })
}

mod indicators {
    use super::*;

    #[test]
    fn every_indicator_covers_every_bar() {
        let bars = bars_from_closes("2024-01-01", &wave_closes(40));
        assert_eq!(calculate_sma(&bars, 10).len(), 40);
        assert_eq!(calculate_rsi(&bars, 14).len(), 40);
        assert_eq!(calculate_atr(&bars, 14).len(), 40);
    }

    #[test]
    fn rsi_extremes_on_streaks() {
        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let rsi = calculate_rsi(&bars_from_closes("2024-01-01", &falling), 14);
        assert_relative_eq!(rsi.value_at(19).unwrap(), 0.0);

        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let rsi = calculate_rsi(&bars_from_closes("2024-01-01", &rising), 14);
        assert_relative_eq!(rsi.value_at(19).unwrap(), 100.0);
    }

    #[test]
    fn short_history_yields_no_values_and_no_signals() {
        let bars = bars_from_closes("2024-01-01", &wave_closes(30));
        assert!(calculate_sma(&bars, 60).first_defined().is_none());

        let s = series("SHORT", bars);
        let strategy = Strategy::default();
        assert_eq!(strategy.history_warnings(s.len()).len(), 1);
        let signals = strategy.generate_signals(&s);
        assert_eq!(signals.len(), 30);
        assert!(signals.iter().all(|p| p.signal == Signal::Hold));
    }
}

mod strategies {
    use super::*;

    #[test]
    fn golden_cross_emits_single_buy_at_crossing_bar() {
        let s = series("GC", bars_from_closes("2024-01-01", &golden_cross_closes(80)));
        let signals = momentum(5, 20).generate_signals(&s);

        assert_eq!(signals.len(), 80);
        assert_eq!(signals[30].signal, Signal::Buy);
        assert!(signals[..30].iter().all(|p| p.signal == Signal::Hold));
        let buys = signals.iter().filter(|p| p.signal == Signal::Buy).count();
        assert_eq!(buys, 1);
        assert!(signals.iter().all(|p| p.signal != Signal::Sell));
    }

    #[test]
    fn signals_alternate_buy_and_sell() {
        let s = series("WAVE", bars_from_closes("2024-01-01", &wave_closes(400)));
        for strategy in [
            momentum(5, 20),
            Strategy::MeanReversion(MeanReversionParams::default()),
        ] {
            let actions: Vec<Signal> = strategy
                .generate_signals(&s)
                .into_iter()
                .map(|p| p.signal)
                .filter(|&k| k != Signal::Hold)
                .collect();
            assert!(!actions.is_empty(), "{} never traded", strategy.name());
            assert_eq!(actions[0], Signal::Buy);
            for pair in actions.windows(2) {
                assert_ne!(pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn mean_reversion_buys_carry_stop_distance() {
        let s = series("WAVE", bars_from_closes("2024-01-01", &wave_closes(300)));
        let signals = Strategy::MeanReversion(MeanReversionParams::default()).generate_signals(&s);
        let buys: Vec<_> = signals.iter().filter(|p| p.signal == Signal::Buy).collect();
        assert!(!buys.is_empty());
        assert!(buys.iter().all(|p| p.stop_distance.is_some_and(|d| d > 0.0)));
    }
}

mod full_backtest_pipeline {
    use super::*;

    #[test]
    fn golden_cross_trade_opens_next_bar_and_closes_at_end() {
        let s = series("GC", bars_from_closes("2024-01-01", &golden_cross_closes(40)));
        let result = run_strategy(&s, &momentum(5, 20), &sample_config()).unwrap();

        assert_eq!(result.trades().len(), 1);
        let trade = &result.trades()[0];
        assert_eq!(trade.entry_date, s.bars()[31].date);
        assert_relative_eq!(trade.entry_price, s.bars()[31].open);
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_eq!(trade.exit_date, s.last_date());
        assert_eq!(result.equity_curve().len(), 40);
    }

    #[test]
    fn same_close_enters_on_crossing_bar() {
        let s = series("GC", bars_from_closes("2024-01-01", &golden_cross_closes(40)));
        let config = BacktestConfig {
            execution: ExecutionConfig {
                fill_policy: FillPolicy::SameClose,
                ..Default::default()
            },
            ..sample_config()
        };
        let result = run_strategy(&s, &momentum(5, 20), &config).unwrap();

        let trade = &result.trades()[0];
        assert_eq!(trade.entry_date, s.bars()[30].date);
        assert_relative_eq!(trade.entry_price, 130.0);
    }

    #[test]
    fn metrics_agree_with_ledger() {
        let s = series("WAVE", bars_from_closes("2024-01-01", &wave_closes(300)));
        let config = sample_config();
        let result = run_strategy(&s, &momentum(5, 20), &config).unwrap();
        let metrics =
            PerformanceMetrics::compute(result.equity_curve(), result.trades(), config.risk_free_rate);

        assert_eq!(metrics.total_trades, result.trades().len());
        assert_eq!(
            metrics.trades_won + metrics.trades_lost + metrics.trades_breakeven,
            metrics.total_trades
        );
        assert_relative_eq!(metrics.final_equity, result.final_equity());
        assert_relative_eq!(
            metrics.total_return,
            result.final_equity() / config.initial_capital - 1.0,
            epsilon = 1e-12
        );
        // flat at the end, so final equity is realised PnL on top of the start
        let realised: f64 = result.trades().iter().map(|t| t.pnl).sum();
        assert_relative_eq!(
            result.final_equity(),
            config.initial_capital + realised,
            epsilon = 1e-6
        );
    }

    #[test]
    fn costs_reduce_final_equity() {
        let s = series("WAVE", bars_from_closes("2024-01-01", &wave_closes(300)));
        let frictionless = run_strategy(&s, &momentum(5, 20), &sample_config()).unwrap();
        let costly_config = BacktestConfig {
            execution: ExecutionConfig {
                commission_rate: 0.001425,
                slippage_rate: 0.001,
                fill_policy: FillPolicy::NextOpen,
            },
            ..sample_config()
        };
        let costly = run_strategy(&s, &momentum(5, 20), &costly_config).unwrap();

        assert_eq!(frictionless.trades().len(), costly.trades().len());
        assert!(costly.final_equity() < frictionless.final_equity());
    }

    #[test]
    fn tiny_account_never_trades() {
        let s = series("GC", bars_from_closes("2024-01-01", &golden_cross_closes(40)));
        let config = BacktestConfig {
            initial_capital: 5.0,
            ..Default::default()
        };
        let result = run_strategy(&s, &momentum(5, 20), &config).unwrap();

        assert!(result.trades().is_empty());
        assert_eq!(result.skipped_entries, 1);
        assert!(result.equity_curve().iter().all(|p| p.equity == 5.0));
    }
}

mod optimizer {
    use super::*;

    #[test]
    fn best_candidate_matches_direct_backtest() {
        let s = series("WAVE", bars_from_closes("2024-01-01", &wave_closes(250)));
        let config = sample_config();
        let grid = ParamGrid::Momentum {
            fast_windows: vec![3, 5, 10],
            slow_windows: vec![20, 30],
        };
        let report = optimize(&s, &grid, &config).unwrap();
        let best = report.best().unwrap();

        let direct = run_strategy(&s, &best.strategy, &config).unwrap();
        let metrics =
            PerformanceMetrics::compute(direct.equity_curve(), direct.trades(), config.risk_free_rate);
        assert_eq!(best.metrics, metrics);
        assert!(report
            .runs
            .iter()
            .all(|r| r.metrics.sharpe_ratio <= best.metrics.sharpe_ratio));
    }
}

fn closes_strategy() -> impl proptest::strategy::Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.04f64..0.04, 20..160).prop_map(|returns| {
        let mut price = 100.0;
        returns
            .into_iter()
            .map(|r| {
                price *= 1.0 + r;
                price
            })
            .collect()
    })
}

fn fill_policy_strategy() -> impl proptest::strategy::Strategy<Value = FillPolicy> {
    prop_oneof![Just(FillPolicy::NextOpen), Just(FillPolicy::SameClose)]
}

proptest! {
    #[test]
    fn equity_curve_matches_series_and_balances(
        closes in closes_strategy(),
        fill_policy in fill_policy_strategy(),
        stop_multiple in 0.0f64..3.0,
    ) {
        let s = series("PROP", bars_from_closes("2020-01-01", &closes));
        let config = BacktestConfig {
            execution: ExecutionConfig {
                commission_rate: 0.001,
                slippage_rate: 0.0005,
                fill_policy,
            },
            ..sample_config()
        };
        let strategies = [
            momentum(3, 8),
            Strategy::MeanReversion(MeanReversionParams {
                rsi_window: 5,
                atr_window: 5,
                stop_multiple,
                ..Default::default()
            }),
        ];

        for strategy in &strategies {
            let result = run_strategy(&s, strategy, &config).unwrap();

            prop_assert_eq!(result.equity_curve().len(), s.len());
            for (point, bar) in result.equity_curve().iter().zip(s.bars()) {
                prop_assert_eq!(point.date, bar.date);
                prop_assert!(point.cash >= -1e-9);
                prop_assert!((point.equity - (point.cash + point.position_value)).abs() < 1e-6);
            }
            prop_assert!(!result.portfolio.is_long());

            for pair in result.trades().windows(2) {
                prop_assert!(pair[0].exit_date <= pair[1].entry_date);
            }
            for trade in result.trades() {
                prop_assert!(trade.entry_date <= trade.exit_date);
                prop_assert!(trade.quantity > 0);
            }
        }
    }

    #[test]
    fn backtest_is_idempotent(closes in closes_strategy()) {
        let s = series("PROP", bars_from_closes("2020-01-01", &closes));
        let strategy = momentum(3, 8);
        let signals = strategy.generate_signals(&s);
        let config = sample_config();

        let first = run_backtest(&s, &signals, &config).unwrap();
        let second = run_backtest(&s, &signals, &config).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn drawdown_is_a_fraction(closes in closes_strategy()) {
        let s = series("PROP", bars_from_closes("2020-01-01", &closes));
        let result = run_strategy(&s, &momentum(3, 8), &sample_config()).unwrap();
        let metrics = PerformanceMetrics::compute(result.equity_curve(), result.trades(), 0.0);

        prop_assert!((0.0..=1.0).contains(&metrics.max_drawdown));
        prop_assert!(metrics.annualized_volatility >= 0.0);
        prop_assert!((0.0..=1.0).contains(&metrics.win_rate));
    }
}
