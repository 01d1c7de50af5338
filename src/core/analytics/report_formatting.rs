//! Plain-text rendering of GA4 report tables for the model.

use super::analytics_models::{PropertySummary, ReportRequest, ReportTable};

/// Rows past this are summarised instead of printed.
const MAX_PRINTED_ROWS: usize = 200;

/// Renders a report as a pipe-separated table with a header line.
///
/// # Example Output
/// ```text
/// 📊 Report for property 123 (last7days)
///
/// date | totalUsers | sessions
/// 20240101 | 10 | 12
///
/// Total rows: 1
/// ```
pub fn format_report(request: &ReportRequest, table: &ReportTable) -> String {
    let property = request.property_id.trim_start_matches("properties/");
    let range = request.date_range.label();

    if table.is_empty() {
        return format!("📊 No data for property {} in {}", property, range);
    }

    let header: Vec<&str> = table
        .dimension_headers
        .iter()
        .chain(table.metric_headers.iter())
        .map(String::as_str)
        .collect();

    let mut lines = vec![
        format!("📊 Report for property {} ({})\n", property, range),
        header.join(" | "),
    ];
    for row in table.rows.iter().take(MAX_PRINTED_ROWS) {
        let cells: Vec<&str> = row
            .dimensions
            .iter()
            .chain(row.metrics.iter())
            .map(String::as_str)
            .collect();
        lines.push(cells.join(" | "));
    }
    if table.rows.len() > MAX_PRINTED_ROWS {
        lines.push(format!(
            "... {} more rows not shown",
            table.rows.len() - MAX_PRINTED_ROWS
        ));
    }

    lines.push(format!("\nTotal rows: {}", table.row_count.max(table.rows.len() as u64)));
    lines.join("\n")
}

pub fn format_properties(properties: &[PropertySummary]) -> String {
    if properties.is_empty() {
        return "📊 No Google Analytics properties found.".to_string();
    }

    let mut lines = vec!["📊 Google Analytics Properties:\n".to_string()];
    for property in properties {
        lines.push(format!(
            "• {} (ID: {}) - Account: {}",
            property.display_name, property.property_id, property.account_name
        ));
    }
    lines.join("\n")
}

/// Drops a trailing `.0` so counts read like counts.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
