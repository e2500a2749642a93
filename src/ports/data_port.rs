//! Data access port trait.

use crate::domain::error::TwtraderError;
use crate::domain::price_series::PriceSeries;

pub trait DataPort {
    /// Load and validate the full history of `symbol`.
    fn load_series(&self, symbol: &str) -> Result<PriceSeries, TwtraderError>;
}
