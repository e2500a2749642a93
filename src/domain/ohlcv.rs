//! OHLCV bar representation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Checks the bar's internal consistency, returning a reason on failure.
    pub fn check(&self) -> Result<(), String> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(format!("{} on {} is not a finite number", name, self.date));
            }
            if value < 0.0 {
                return Err(format!("{} on {} is negative ({})", name, self.date, value));
            }
        }
        if self.high < self.low {
            return Err(format!(
                "high {} below low {} on {}",
                self.high, self.low, self.date
            ));
        }
        if self.high < self.open.max(self.close) {
            return Err(format!(
                "high {} below open/close on {}",
                self.high, self.date
            ));
        }
        if self.low > self.open.min(self.close) {
            return Err(format!("low {} above open/close on {}", self.low, self.date));
        }
        Ok(())
    }
}
