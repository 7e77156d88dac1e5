//! Error kinds surfaced by request construction, price providers and the calculator.

use chrono::NaiveDate;
use thiserror::Error;

/// Rejections raised while building a [`SearchRequest`](crate::core::request::SearchRequest).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol '{symbol}' is longer than {max} characters")]
    SymbolTooLong { symbol: String, max: usize },
    #[error("year {year} is not a valid calendar year")]
    InvalidYear { year: i32 },
    #[error("start date {date} must be after {min}")]
    StartDateTooEarly { date: NaiveDate, min: NaiveDate },
    #[error("start date {date} is later than today ({today})")]
    StartDateInFuture { date: NaiveDate, today: NaiveDate },
    #[error("{field} of {amount} exceeds the maximum of {max}")]
    AmountTooLarge {
        field: &'static str,
        amount: u64,
        max: u64,
    },
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No price data found for symbol: {0}")]
    UnknownSymbol(String),
    #[error("HTTP error: {status} for symbol: {symbol}")]
    Http {
        status: reqwest::StatusCode,
        symbol: String,
    },
    #[error("Request error: {source} for symbol: {symbol}")]
    Request {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to parse response for {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },
    #[error("No current price or previous close for symbol: {0}")]
    MissingPrice(String),
}

/// Failures of a return calculation. Each one is final for the request.
#[derive(Debug, Error)]
pub enum ReturnError {
    #[error("\"{0}\" is not a valid symbol")]
    InvalidSymbol(String),
    #[error("no price data for {symbol} on or after {start_date}")]
    NoDataAtStart {
        symbol: String,
        start_date: NaiveDate,
    },
    #[error("price {price} for {symbol} on {date} cannot be used")]
    InvalidPrice {
        symbol: String,
        date: NaiveDate,
        price: f64,
    },
    #[error(transparent)]
    Provider(ProviderError),
}

impl From<ProviderError> for ReturnError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::UnknownSymbol(symbol) => ReturnError::InvalidSymbol(symbol),
            other => ReturnError::Provider(other),
        }
    }
}
