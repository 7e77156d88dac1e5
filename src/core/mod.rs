//! Core business logic abstractions

pub mod calculator;
pub mod config;
pub mod error;
pub mod log;
pub mod price;
pub mod request;

// Re-export main types for cleaner imports
pub use calculator::{InvestmentEvent, PercentChange, ReturnCalculator, ReturnResult};
pub use error::{ProviderError, RequestError, ReturnError};
pub use price::{PriceHistoryProvider, PriceSample, PriceSeries, Quote};
pub use request::SearchRequest;
