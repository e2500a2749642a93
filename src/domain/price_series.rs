//! Validated, immutable price history for one instrument.

use chrono::NaiveDate;

use super::error::TwtraderError;
use super::ohlcv::OhlcvBar;

/// Ordered bars with strictly increasing dates.
///
/// The only way to build one is [`PriceSeries::new`], so every instance has
/// already passed the integrity checks and holds at least one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, TwtraderError> {
        let symbol = symbol.into();

        if bars.is_empty() {
            return Err(TwtraderError::data_integrity(&symbol, "price series is empty"));
        }

        for bar in &bars {
            bar.check()
                .map_err(|reason| TwtraderError::data_integrity(&symbol, reason))?;
        }

        for pair in bars.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            if curr.date == prev.date {
                return Err(TwtraderError::data_integrity(
                    &symbol,
                    format!("duplicate date {}", curr.date),
                ));
            }
            if curr.date < prev.date {
                return Err(TwtraderError::data_integrity(
                    &symbol,
                    format!("date {} follows later date {}", curr.date, prev.date),
                ));
            }
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.bars.iter().map(|b| b.close)
    }
}
