// 🚨 Error Taxonomy
// One error type for every pipeline stage; the binary wraps it with anyhow

use std::fmt::Display;
use std::path::PathBuf;

/// EtlError - every way a pipeline run can fail
///
/// All stages are fail-fast, so each variant is terminal for the run.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// Page or reference file could not be fetched
    #[error("network error: {0}")]
    Network(String),

    /// Target table not found, wrong shape, or too few usable rows
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A required currency is absent from the exchange-rate table
    #[error("missing exchange rate for currency {currency}")]
    MissingRate { currency: String },

    /// File read/write failure
    #[error("I/O error at {path:?}: {message}")]
    Io { path: PathBuf, message: String },

    /// Table store connection or write failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed, mutating, or unsatisfiable SQL
    #[error("query error: {0}")]
    Query(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;

impl EtlError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn missing_rate(currency: impl Into<String>) -> Self {
        Self::MissingRate {
            currency: currency.into(),
        }
    }

    /// Wrap any I/O-ish failure with the path it happened on
    pub fn io(path: impl Into<PathBuf>, err: impl Display) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for EtlError {
    fn from(err: rusqlite::Error) -> Self {
        EtlError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for EtlError {
    fn from(err: reqwest::Error) -> Self {
        EtlError::Network(err.to_string())
    }
}
