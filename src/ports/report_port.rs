//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TwtraderError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::strategy::Strategy;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        metrics: &PerformanceMetrics,
    ) -> Result<(), TwtraderError>;
}
