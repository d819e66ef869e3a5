use tracing::{error, info};

/// Informational sink for run banners and reports. Never consulted for control flow.
pub trait RunReporter: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
    fn table(&self, headers: &[&str], rows: &[Vec<String>]);
}

/// Forwards everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl RunReporter for TracingReporter {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }

    fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        for line in render_table(headers, rows).lines() {
            info!("{line}");
        }
    }
}

/// Renders a left-aligned, fixed-width text table.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            } else {
                widths.push(cell.len());
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format_row(headers.iter().copied(), &widths));
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    for row in rows {
        out.push('\n');
        out.push_str(&format_row(row.iter().map(String::as_str), &widths));
    }
    out
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .enumerate()
        .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
