//! Pricing abstractions and core types

use crate::core::error::ProviderError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Opening price of one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub date: NaiveDate,
    pub open: f64,
}

/// Daily samples ordered by date ascending, one per trading day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    samples: Vec<PriceSample>,
}

impl PriceSeries {
    pub fn new(mut samples: Vec<PriceSample>) -> Self {
        samples.sort_by_key(|s| s.date);
        samples.dedup_by_key(|s| s.date);
        Self { samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[PriceSample] {
        &self.samples
    }

    /// First sample dated `date` or later.
    pub fn first_on_or_after(&self, date: NaiveDate) -> Option<&PriceSample> {
        let index = self.samples.partition_point(|s| s.date < date);
        self.samples.get(index)
    }

    /// Samples in `[from, until)`.
    pub fn window(&self, from: NaiveDate, until: NaiveDate) -> &[PriceSample] {
        let start = self.samples.partition_point(|s| s.date < from);
        let end = self.samples.partition_point(|s| s.date < until).max(start);
        &self.samples[start..end]
    }
}

/// Latest known prices for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub current_price: Option<f64>,
    pub previous_close: f64,
}

impl Quote {
    /// Current price when the market reports one, else the previous close.
    pub fn ending_price(&self) -> f64 {
        self.current_price.unwrap_or(self.previous_close)
    }
}

#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Latest quote. An unknown symbol yields [`ProviderError::UnknownSymbol`].
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError>;

    /// Daily open prices for `start..=end`. Empty when nothing traded in range.
    async fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, ProviderError>;
}
