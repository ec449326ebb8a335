//! Error type shared by the ingestion pipeline.

use chrono::NaiveDate;
use thiserror::Error;

use crate::currency::CurrencyCode;

#[derive(Error, Debug)]
pub enum HomebudgetError {
    /// Network or feed unavailable, or a non-success HTTP status.
    #[error("Fetch error: {message}")]
    Fetch { message: String, retryable: bool },

    /// Malformed XML/JSON payload or unsupported character encoding.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Amount token is not a valid integer, or the symbol table is inconsistent.
    #[error("Format error: {0}")]
    Format(String),

    /// Receipt banner, header or numeric line is missing or malformed.
    #[error("Structure error: {0}")]
    Structure(String),

    #[error("Currency {code} not found in rate table for {date}")]
    CurrencyNotFound { code: CurrencyCode, date: NaiveDate },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HomebudgetError {
    pub fn fetch(message: impl Into<String>, retryable: bool) -> Self {
        HomebudgetError::Fetch {
            message: message.into(),
            retryable,
        }
    }

    /// Whether repeating the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HomebudgetError::Fetch { retryable: true, .. })
    }
}

/// Result type alias for homebudget operations
pub type Result<T> = std::result::Result<T, HomebudgetError>;
