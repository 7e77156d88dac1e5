use super::prompt::Prompter;
use super::{report, ui};
use crate::CalculateArgs;
use crate::core::{PriceHistoryProvider, RequestError, ReturnCalculator, SearchRequest};
use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use std::io::{BufRead, Write};
use tracing::{debug, info};

pub async fn run(
    args: CalculateArgs,
    provider: &dyn PriceHistoryProvider,
    currency: &str,
) -> Result<()> {
    let today = Local::now().date_naive();
    let explain = args.explain;
    let request = resolve_request(args, &mut Prompter::stdio(), today)?;
    info!(?request, "Calculating returns");

    let pb = ui::new_spinner(format!("Fetching prices for {}", request.symbol()));
    let calculator = ReturnCalculator::new(request, provider).as_of(today);
    let outcome = calculator.returns().await;
    pb.finish_and_clear();

    match outcome {
        Ok(result) => {
            debug!(events = result.events.len(), "Calculation finished");
            report::display(calculator.request(), result, currency, explain);
            Ok(())
        }
        Err(err) => {
            eprintln!(
                "{}",
                ui::style_text(&report::failure_message(&err), ui::StyleType::Error)
            );
            Err(err.into())
        }
    }
}

/// Fills the fields missing from `args` by prompting. The monthly amount is
/// only asked for when some other field had to be asked for too.
pub fn resolve_request<R: BufRead, W: Write>(
    args: CalculateArgs,
    prompter: &mut Prompter<R, W>,
    today: NaiveDate,
) -> Result<SearchRequest> {
    let interactive = args.symbol.is_none()
        || (args.year.is_none() && args.start_date.is_none())
        || args.principal.is_none();

    let symbol = match args.symbol {
        Some(symbol) => symbol,
        None => prompter.ticker_symbol()?,
    };

    let start_date = match (args.start_date, args.year) {
        (Some(date), _) => date,
        (None, Some(year)) => first_of_year(year)?,
        (None, None) => first_of_year(prompter.buy_year(today.year())?)?,
    };

    let principal = match args.principal {
        Some(amount) => amount,
        None => prompter.dollar_amount("Enter a principal investment amount: $")?,
    };

    let monthly = match args.monthly {
        Some(amount) => amount,
        None if interactive => prompter
            .optional_dollar_amount("Enter a monthly investment amount (blank for none): $")?,
        None => 0,
    };

    Ok(SearchRequest::new_as_of(
        &symbol, start_date, principal, monthly, today,
    )?)
}

fn first_of_year(year: i32) -> Result<NaiveDate, RequestError> {
    NaiveDate::from_ymd_opt(year, 1, 1).ok_or(RequestError::InvalidYear { year })
}
