#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;
use twtrader::domain::backtest::{BacktestConfig, BacktestResult};
use twtrader::domain::error::TwtraderError;
use twtrader::domain::metrics::PerformanceMetrics;
pub use twtrader::domain::ohlcv::OhlcvBar;
use twtrader::domain::price_series::PriceSeries;
use twtrader::domain::strategy::Strategy;
use twtrader::ports::data_port::DataPort;
use twtrader::ports::report_port::ReportPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }
}

impl DataPort for MockDataPort {
    fn load_series(&self, symbol: &str) -> Result<PriceSeries, TwtraderError> {
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => PriceSeries::new(symbol, bars.clone()),
            _ => Err(TwtraderError::NoData {
                symbol: symbol.to_string(),
            }),
        }
    }
}

pub struct MockReportPort {
    pub calls: RefCell<Vec<(BacktestResult, Strategy, PerformanceMetrics)>>,
}

impl MockReportPort {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl ReportPort for MockReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        metrics: &PerformanceMetrics,
    ) -> Result<(), TwtraderError> {
        self.calls
            .borrow_mut()
            .push((result.clone(), strategy.clone(), metrics.clone()));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// Daily bars from `start_date`, one per close, open at the previous close.
pub fn bars_from_closes(start_date: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count).map(|i| start_price + i as f64).collect();
    bars_from_closes(start_date, &closes)
}

/// Steady decline for 30 bars, then a jump to 130 held flat.
///
/// With SMA(5)/SMA(20) the fast average first rises above the slow one on
/// bar 30 and never falls back below it.
pub fn golden_cross_closes(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| if i < 30 { 100.0 - i as f64 } else { 130.0 })
        .collect()
}

/// Deterministic oscillating series with a slow upward drift.
pub fn wave_closes(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 100.0 + 12.0 * (i as f64 / 9.0).sin() + 0.03 * i as f64)
        .collect()
}

pub fn series(symbol: &str, bars: Vec<OhlcvBar>) -> PriceSeries {
    PriceSeries::new(symbol, bars).unwrap()
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        initial_capital: 100_000.0,
        ..Default::default()
    }
}
