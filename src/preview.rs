//! Console preview of query results.
//!
//! Only the first rows are shown; the CSV export always carries the full
//! result.

use crate::db::QueryResult;

/// Longest cell rendered before truncation.
const MAX_CELL_WIDTH: usize = 40;

/// Renders the first `max_rows` rows of a result as a text table.
pub fn render_preview(result: &QueryResult, max_rows: usize) -> String {
    if result.columns.is_empty() {
        return "(no columns)".to_string();
    }

    let headers: Vec<String> = result.columns.iter().map(|c| c.name.clone()).collect();
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .take(max_rows)
        .map(|row| row.iter().map(|v| clip(&v.to_display_string())).collect())
        .collect();

    let mut output = format_table(&headers, &rows);

    let hidden = result.row_count().saturating_sub(max_rows);
    if hidden > 0 {
        output.push_str(&format!("\n… {hidden} more row(s) not shown"));
    } else if result.is_empty() {
        output.push_str("\n(no rows)");
    }

    output
}

fn clip(cell: &str) -> String {
    let single_line = cell.replace(['\n', '\r'], " ");
    if single_line.chars().count() > MAX_CELL_WIDTH {
        let kept: String = single_line.chars().take(MAX_CELL_WIDTH - 1).collect();
        format!("{kept}…")
    } else {
        single_line
    }
}

/// Formats a table as a string for display.
fn format_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let mut output = String::new();

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    output.push_str(&header_line.join(" │ "));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    output.push_str(&separator.join("─┼─"));
    output.push('\n');

    for row in rows {
        let row_line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = width)
            })
            .collect();
        output.push_str(row_line.join(" │ ").trim_end());
        output.push('\n');
    }

    output.trim_end().to_string()
}
