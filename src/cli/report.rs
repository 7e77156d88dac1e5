use super::ui;
use crate::core::{ReturnError, ReturnResult, SearchRequest};
use comfy_table::{Cell, CellAlignment, Table};
use rust_decimal::Decimal;

pub fn display(request: &SearchRequest, result: &ReturnResult, currency: &str, explain: bool) {
    println!("\n{}", summary_sentence(request, result));
    println!("{}", summary_table(result, currency));

    if explain {
        println!(
            "\n{}",
            ui::style_text("Investment log", ui::StyleType::Title)
        );
        println!("{}", events_table(result, currency));
    }
}

pub fn summary_sentence(request: &SearchRequest, result: &ReturnResult) -> String {
    format!(
        "If you had invested ${} into {} on {} with a monthly investment of ${}, you would now have {}",
        request.principal(),
        request.symbol(),
        request.start_date(),
        request.monthly(),
        ui::style_text(
            &format!("${:.2}", result.final_value),
            ui::StyleType::TotalValue
        ),
    )
}

pub fn summary_table(result: &ReturnResult, currency: &str) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);

    table.add_row(vec![
        ui::label_cell("Final value"),
        ui::money_cell(result.final_value, currency),
    ]);
    table.add_row(vec![
        ui::label_cell("Total invested"),
        ui::money_cell(Decimal::from(result.total_invested), currency),
    ]);
    table.add_row(vec![
        ui::label_cell("Change"),
        result.percent_change().map_or_else(ui::na_cell, ui::change_cell),
    ]);
    table.add_row(vec![
        ui::label_cell("Annualized"),
        result.annualized_return().map_or_else(ui::na_cell, |rate| {
            Cell::new(format!("{rate:.2}%")).set_alignment(CellAlignment::Right)
        }),
    ]);
    table.add_row(vec![
        ui::label_cell("Ending price"),
        Cell::new(format!("{:.2}", result.ending_price)).set_alignment(CellAlignment::Right),
    ]);

    if result.pending_carry_over > 0 {
        table.add_row(vec![
            ui::label_cell("Not yet invested"),
            ui::money_cell(Decimal::from(result.pending_carry_over), currency),
        ]);
    }

    table
}

pub fn events_table(result: &ReturnResult, currency: &str) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Scheduled"),
        ui::header_cell("Bought"),
        ui::header_cell("Amount"),
        ui::header_cell("Open price"),
    ]);

    for event in &result.events {
        table.add_row(vec![
            Cell::new(event.scheduled),
            Cell::new(event.traded),
            ui::money_cell(Decimal::from(event.amount), currency),
            Cell::new(format!("{:.2}", event.price)).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

/// What to tell the user when a calculation fails.
pub fn failure_message(err: &ReturnError) -> String {
    match err {
        ReturnError::InvalidSymbol(symbol) => {
            format!("\"{symbol}\" is not a valid symbol. Please enter a valid symbol.")
        }
        ReturnError::NoDataAtStart { symbol, start_date } => format!(
            "No trading data for {symbol} on or after {start_date}. The date must be after the first trade of {symbol}."
        ),
        other => format!("Could not calculate returns: {other}"),
    }
}
