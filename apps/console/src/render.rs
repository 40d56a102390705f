use std::fmt::Write as _;

use client_core::{Exportable, PageStats, RenderSink};

/// Keeps the most recent frame so only the settled state reaches the terminal.
#[derive(Debug, Default)]
pub struct TerminalSink {
    frame: String,
}

impl TerminalSink {
    pub fn frame(&self) -> &str {
        &self.frame
    }
}

impl<T: Exportable> RenderSink<T> for TerminalSink {
    fn render_table(&mut self, rows: &[T]) {
        self.frame.clear();
        if rows.is_empty() {
            self.frame.push_str(&format!("No {} matches the current filters.\n", T::KIND));
            return;
        }

        let headers = T::headers();
        let body: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                row.cells()
                    .iter()
                    .map(|cell| cell.render(T::OPTIONS.decimal_comma))
                    .collect()
            })
            .collect();
        let widths = column_widths(headers, &body);

        push_row(&mut self.frame, headers.iter().copied(), &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_row(&mut self.frame, rule.iter().map(String::as_str), &widths);
        for line in &body {
            push_row(&mut self.frame, line.iter().map(String::as_str), &widths);
        }
    }

    fn render_pagination(&mut self, current_page: usize, total_pages: usize) {
        let _ = writeln!(self.frame, "\nPage {current_page} / {total_pages}");
    }

    fn render_stats(&mut self, page: &PageStats, summary: &T::Summary) {
        let _ = writeln!(
            self.frame,
            "Showing {}-{} of {} {}(s)",
            page.start_row,
            page.end_row,
            page.total_rows,
            T::KIND
        );
        let _ = writeln!(self.frame, "{summary:?}");
    }
}

fn column_widths(headers: &[&str], body: &[Vec<String>]) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            body.iter()
                .filter_map(|line| line.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect()
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}
