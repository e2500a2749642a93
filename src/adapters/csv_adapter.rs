//! CSV file data adapter.
//!
//! One file per symbol, `<base_path>/<SYMBOL>.csv`, header
//! `date,open,high,low,close,volume`, ISO dates. Rows are kept in file order;
//! ordering problems surface as `DataIntegrity` from [`PriceSeries::new`].

use crate::domain::error::TwtraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::price_series::PriceSeries;
use crate::ports::data_port::DataPort;
use std::io;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl DataPort for CsvAdapter {
    fn load_series(&self, symbol: &str) -> Result<PriceSeries, TwtraderError> {
        let path = self.csv_path(symbol);
        let mut rdr = match csv::Reader::from_path(&path) {
            Ok(rdr) => rdr,
            Err(e) => {
                if let csv::ErrorKind::Io(io_err) = e.kind() {
                    if io_err.kind() == io::ErrorKind::NotFound {
                        return Err(TwtraderError::NoData {
                            symbol: symbol.to_string(),
                        });
                    }
                }
                return Err(e.into());
            }
        };

        let mut bars = Vec::new();
        for (i, row) in rdr.deserialize::<OhlcvBar>().enumerate() {
            // header is line 1
            let bar = row.map_err(|e| {
                TwtraderError::data_integrity(symbol, format!("line {}: {}", i + 2, e))
            })?;
            bars.push(bar);
        }

        if bars.is_empty() {
            return Err(TwtraderError::NoData {
                symbol: symbol.to_string(),
            });
        }

        tracing::info!(symbol, bars = bars.len(), path = %path.display(), "loaded price data");
        PriceSeries::new(symbol, bars)
    }
}
