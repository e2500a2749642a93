//! Domain error types.

/// Top-level error type for twtrader.
#[derive(Debug, thiserror::Error)]
pub enum TwtraderError {
    #[error("data integrity error in {symbol}: {reason}")]
    DataIntegrity { symbol: String, reason: String },

    #[error("invalid configuration [{section}] {key}: {reason}")]
    Configuration {
        section: String,
        key: String,
        reason: String,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TwtraderError {
    pub fn data_integrity(symbol: &str, reason: impl Into<String>) -> Self {
        TwtraderError::DataIntegrity {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn configuration(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TwtraderError::Configuration {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TwtraderError> for std::process::ExitCode {
    fn from(err: &TwtraderError) -> Self {
        let code: u8 = match err {
            TwtraderError::Io(_) | TwtraderError::Csv(_) | TwtraderError::Json(_) => 1,
            TwtraderError::Configuration { .. }
            | TwtraderError::ConfigParse { .. }
            | TwtraderError::ConfigMissing { .. } => 2,
            TwtraderError::DataIntegrity { .. } => 3,
            TwtraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Indicator window longer than the available history.
///
/// Not an error: the indicator still covers every bar, its values are simply
/// all undefined and any strategy reading it holds for the whole series.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{indicator} needs {required} bars of history, only {available} available")]
pub struct InsufficientHistory {
    pub indicator: String,
    pub required: usize,
    pub available: usize,
}
