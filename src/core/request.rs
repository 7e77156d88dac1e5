//! The immutable description of one "what if I had invested" question.

use crate::core::error::RequestError;
use chrono::{Local, NaiveDate};
use serde::Serialize;

pub const MAX_SYMBOL_LEN: usize = 5;
pub const MAX_AMOUNT: u64 = 1_000_000_000_000;
pub const MIN_YEAR: i32 = 1700;

/// Earliest date a request may start on; the start date must be strictly after it.
pub fn earliest_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(MIN_YEAR, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SearchRequest {
    symbol: String,
    start_date: NaiveDate,
    principal: u64,
    monthly: u64,
}

impl SearchRequest {
    /// Validates the inputs against today's local date.
    pub fn new(
        symbol: &str,
        start_date: NaiveDate,
        principal: u64,
        monthly: u64,
    ) -> Result<Self, RequestError> {
        Self::new_as_of(symbol, start_date, principal, monthly, Local::now().date_naive())
    }

    pub fn new_as_of(
        symbol: &str,
        start_date: NaiveDate,
        principal: u64,
        monthly: u64,
        today: NaiveDate,
    ) -> Result<Self, RequestError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(RequestError::EmptySymbol);
        }
        if symbol.chars().count() > MAX_SYMBOL_LEN {
            return Err(RequestError::SymbolTooLong {
                symbol: symbol.to_string(),
                max: MAX_SYMBOL_LEN,
            });
        }

        let min = earliest_start();
        if start_date <= min {
            return Err(RequestError::StartDateTooEarly {
                date: start_date,
                min,
            });
        }
        if start_date > today {
            return Err(RequestError::StartDateInFuture {
                date: start_date,
                today,
            });
        }

        check_amount("principal investment", principal)?;
        check_amount("monthly investment", monthly)?;

        Ok(Self {
            symbol: symbol.to_ascii_uppercase(),
            start_date,
            principal,
            monthly,
        })
    }

    /// Builds a request starting on January 1st of `year`.
    pub fn for_year(
        symbol: &str,
        year: i32,
        principal: u64,
        monthly: u64,
    ) -> Result<Self, RequestError> {
        let start_date =
            NaiveDate::from_ymd_opt(year, 1, 1).ok_or(RequestError::InvalidYear { year })?;
        Self::new(symbol, start_date, principal, monthly)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn principal(&self) -> u64 {
        self.principal
    }

    pub fn monthly(&self) -> u64 {
        self.monthly
    }
}

fn check_amount(field: &'static str, amount: u64) -> Result<(), RequestError> {
    if amount > MAX_AMOUNT {
        return Err(RequestError::AmountTooLarge {
            field,
            amount,
            max: MAX_AMOUNT,
        });
    }
    Ok(())
}
