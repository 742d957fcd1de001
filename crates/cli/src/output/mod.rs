//! Output formatting for CLI results.

pub mod actions;
pub mod report;

pub use actions::format_actions_table;
pub use report::{format_allocation_report, format_epoch_window};

use rust_decimal::{Decimal, RoundingStrategy};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::cli::OutputFormat;

/// Renders rows as a rounded terminal table or a Markdown table.
fn render_table<R: Tabled>(rows: Vec<R>, format: OutputFormat) -> String {
    let mut table = Table::new(rows);
    if format == OutputFormat::Markdown {
        table.with(Style::markdown());
    } else {
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::left()));
    }
    table.to_string()
}

/// Fixed-point rendering, rounding half away from zero.
fn fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

fn format_usd(value: Decimal) -> String {
    let million = Decimal::from(1_000_000);
    let thousand = Decimal::from(1_000);
    if value.abs() >= million {
        format!("${}M", fixed(value / million, 2))
    } else if value.abs() >= thousand {
        format!("${}K", fixed(value / thousand, 2))
    } else {
        format!("${}", fixed(value, 2))
    }
}

fn format_pct(value: Decimal) -> String {
    format!("{}%", fixed(value * Decimal::ONE_HUNDRED, 2))
}

fn format_tokens(value: Decimal) -> String {
    fixed(value, 4)
}
