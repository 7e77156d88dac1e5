//! Hypothetical return of a lump sum plus optional monthly contributions.
//!
//! The principal is bought at the first open on or after the start date. Each
//! monthly contribution is bought at the first open inside its month window,
//! `[start + k months, start + (k + 1) months)`. A window without any trading
//! defers the contribution to the next window that has data.

use crate::core::error::ReturnError;
use crate::core::price::{PriceHistoryProvider, PriceSample, PriceSeries};
use crate::core::request::SearchRequest;
use chrono::{Local, Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy, prelude::*};
use rust_finprim::rate::cagr;
use std::fmt::Display;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

/// Shorter holdings have no meaningful annualized rate.
const MIN_CAGR_DAYS: i64 = 365;

/// One contribution that was actually bought.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvestmentEvent {
    /// Start date for the principal, monthly anniversary otherwise.
    pub scheduled: NaiveDate,
    /// Trading day whose open price was used.
    pub traded: NaiveDate,
    pub amount: u64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentChange(Decimal);

impl PercentChange {
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn magnitude(&self) -> Decimal {
        self.0.abs()
    }

    pub fn is_loss(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn label(&self) -> &'static str {
        if self.is_loss() {
            "decreased"
        } else {
            "increased"
        }
    }
}

impl Display for PercentChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} by {:.2}%", self.label(), self.magnitude())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnResult {
    /// Principal plus every monthly contribution that was bought.
    pub total_invested: u64,
    /// Value of all bought contributions at `ending_price`, in cents.
    pub final_value: Decimal,
    pub ending_price: f64,
    pub events: Vec<InvestmentEvent>,
    /// Deferred monthly dollars that never found a trading day.
    pub pending_carry_over: u64,
    pub as_of: NaiveDate,
}

impl ReturnResult {
    pub fn gain(&self) -> Decimal {
        self.final_value - Decimal::from(self.total_invested)
    }

    /// `None` when nothing was invested.
    pub fn percent_change(&self) -> Option<PercentChange> {
        if self.total_invested == 0 {
            return None;
        }
        let invested = Decimal::from(self.total_invested);
        let pct = (self.final_value - invested)
            .checked_div(invested)?
            .checked_mul(Decimal::ONE_HUNDRED)?;
        Some(PercentChange(round_cents(pct)))
    }

    /// Compound annual growth rate in percent, only for a single lump sum held
    /// for at least a year.
    pub fn annualized_return(&self) -> Option<Decimal> {
        let [event] = self.events.as_slice() else {
            return None;
        };
        let days = (self.as_of - event.traded).num_days();
        if event.amount == 0 || days < MIN_CAGR_DAYS || self.final_value <= Decimal::ZERO {
            return None;
        }

        let beginning = Decimal::from(event.amount);
        let n_years = Decimal::from(days).checked_div(Decimal::new(36525, 2))?;
        // cagr raises the ratio with an unchecked powd; bail out where it would overflow.
        self.final_value
            .checked_div(beginning)?
            .checked_powd(Decimal::ONE.checked_div(n_years)?)?;
        let rate = cagr(beginning, self.final_value, n_years);
        debug!("cagr: {} -> {} over {n_years}yrs = {rate}", event.amount, self.final_value);
        Some(round_cents(rate * Decimal::ONE_HUNDRED))
    }
}

/// Computes the return for one request, querying the provider at most once.
pub struct ReturnCalculator<'a> {
    request: SearchRequest,
    provider: &'a dyn PriceHistoryProvider,
    today: NaiveDate,
    cached: OnceCell<ReturnResult>,
}

impl<'a> ReturnCalculator<'a> {
    pub fn new(request: SearchRequest, provider: &'a dyn PriceHistoryProvider) -> Self {
        Self {
            request,
            provider,
            today: Local::now().date_naive(),
            cached: OnceCell::new(),
        }
    }

    /// Values the request as of `today` instead of the local date.
    pub fn as_of(self, today: NaiveDate) -> Self {
        Self {
            today,
            cached: OnceCell::new(),
            ..self
        }
    }

    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    pub async fn returns(&self) -> Result<&ReturnResult, ReturnError> {
        self.cached.get_or_try_init(|| self.compute()).await
    }

    #[instrument(
        name = "CalculateReturn",
        skip(self),
        fields(symbol = %self.request.symbol(), start = %self.request.start_date())
    )]
    async fn compute(&self) -> Result<ReturnResult, ReturnError> {
        let symbol = self.request.symbol();

        let quote = self.provider.fetch_quote(symbol).await?;
        debug!(?quote, "Resolved quote");

        let history = self
            .provider
            .fetch_history(symbol, self.request.start_date(), self.today)
            .await?;
        debug!(samples = history.len(), "Fetched price history");

        accumulate(&self.request, &history, quote.ending_price(), self.today)
    }
}

/// Applies the principal and monthly contributions against `history`.
pub fn accumulate(
    request: &SearchRequest,
    history: &PriceSeries,
    ending_price: f64,
    today: NaiveDate,
) -> Result<ReturnResult, ReturnError> {
    let symbol = request.symbol();
    let start_date = request.start_date();
    to_price(symbol, today, ending_price)?;
    let ending = PriceSample {
        date: today,
        open: ending_price,
    };

    let opening = history
        .first_on_or_after(start_date)
        .filter(|s| s.date <= today)
        .ok_or_else(|| ReturnError::NoDataAtStart {
            symbol: symbol.to_string(),
            start_date,
        })?;

    let mut total_invested = request.principal();
    let mut final_value = value_at(symbol, request.principal(), &ending, opening)?;
    let mut events = vec![InvestmentEvent {
        scheduled: start_date,
        traded: opening.date,
        amount: request.principal(),
        price: opening.open,
    }];
    let mut carry_over = 0;

    if request.monthly() > 0 {
        let horizon = today.succ_opt().unwrap_or(today);
        for (target, next) in monthly_targets(start_date, today) {
            let due = request.monthly() + carry_over;
            let Some(sample) = history.window(target, next.min(horizon)).first() else {
                debug!(%target, carry_over = due, "No trading in month window");
                carry_over = due;
                continue;
            };

            let value = round_cents(value_at(symbol, due, &ending, sample)?);
            debug!(%target, traded = %sample.date, amount = due, %value, "Applied monthly contribution");

            total_invested += due;
            final_value = final_value
                .checked_add(value)
                .ok_or_else(|| invalid_price(symbol, sample.date, sample.open))?;
            events.push(InvestmentEvent {
                scheduled: target,
                traded: sample.date,
                amount: due,
                price: sample.open,
            });
            carry_over = 0;
        }
    }

    Ok(ReturnResult {
        total_invested,
        final_value: round_cents(final_value),
        ending_price,
        events,
        pending_carry_over: carry_over,
        as_of: today,
    })
}

/// Monthly anniversaries of `start` up to `today`, each paired with the next one.
fn monthly_targets(
    start: NaiveDate,
    today: NaiveDate,
) -> impl Iterator<Item = (NaiveDate, NaiveDate)> {
    (1u32..).map_while(move |k| {
        let target = start.checked_add_months(Months::new(k))?;
        if target > today {
            return None;
        }
        let next = start
            .checked_add_months(Months::new(k + 1))
            .unwrap_or(NaiveDate::MAX);
        Some((target, next))
    })
}

/// Worth at `ending` of `amount` dollars bought at `bought`.
fn value_at(
    symbol: &str,
    amount: u64,
    ending: &PriceSample,
    bought: &PriceSample,
) -> Result<Decimal, ReturnError> {
    let sell = to_price(symbol, ending.date, ending.open)?;
    let buy = to_price(symbol, bought.date, bought.open)?;
    Decimal::from(amount)
        .checked_mul(sell)
        .ok_or_else(|| invalid_price(symbol, ending.date, ending.open))?
        .checked_div(buy)
        .ok_or_else(|| invalid_price(symbol, bought.date, bought.open))
}

fn to_price(symbol: &str, date: NaiveDate, price: f64) -> Result<Decimal, ReturnError> {
    Decimal::from_f64(price)
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| invalid_price(symbol, date, price))
}

fn invalid_price(symbol: &str, date: NaiveDate, price: f64) -> ReturnError {
    ReturnError::InvalidPrice {
        symbol: symbol.to_string(),
        date,
        price,
    }
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
