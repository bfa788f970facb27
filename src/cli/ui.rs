use crate::core::table::{Table, Value};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Good,
    Warning,
    Error,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Good => style(text).green().bold(),
        StyleType::Warning => style(text).yellow().bold(),
        StyleType::Error => style(text).red(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> comfy_table::Table {
    let mut table = comfy_table::Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats a value cell. Numbers are right aligned, nulls shown as "N/A".
pub fn value_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::new("N/A").fg(Color::DarkGrey),
        Value::Integer(_) | Value::Real(_) => {
            Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
        }
        Value::Text(s) => Cell::new(s),
    }
}

/// Renders a warehouse table dump.
pub fn render_table(data: &Table) -> String {
    let mut table = new_styled_table();
    table.set_header(data.columns.iter().map(|c| header_cell(c)));
    for row in &data.rows {
        table.add_row(row.iter().map(value_cell));
    }
    table.to_string()
}

/// Creates a spinner shown while a pipeline run is in flight.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
