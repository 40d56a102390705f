//! Delimited-text export of a filtered view.

use chrono::NaiveDate;
use shared::error::ValidationError;

use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: char,
    pub decimal_comma: bool,
}

impl ExportOptions {
    /// Plain comma-separated values.
    pub const COMMA: ExportOptions = ExportOptions {
        delimiter: ',',
        decimal_comma: false,
    };

    /// Semicolon-separated with `,` as the decimal mark, as spreadsheet tools
    /// in comma-decimal locales expect.
    pub const SEMICOLON_DECIMAL_COMMA: ExportOptions = ExportOptions {
        delimiter: ';',
        decimal_comma: true,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Decimal(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Rendering used by both the export and the console table.
    pub fn render(&self, decimal_comma: bool) -> String {
        match self {
            Cell::Text(value) => value.clone(),
            Cell::Integer(value) => value.to_string(),
            Cell::Decimal(value) => {
                let raw = value.to_string();
                if decimal_comma {
                    raw.replace('.', ",")
                } else {
                    raw
                }
            }
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Integer(i64::from(value))
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Decimal(value)
    }
}

pub trait Exportable: Record {
    const FILE_STEM: &'static str;
    const OPTIONS: ExportOptions;

    fn headers() -> &'static [&'static str];

    /// One cell per header, in header order.
    fn cells(&self) -> Vec<Cell>;
}

/// Header line plus one line per item, joined with `\n`.
pub fn export_delimited<T: Exportable>(items: &[T]) -> Result<String, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::Empty { what: T::KIND });
    }
    let options = T::OPTIONS;

    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(join_line(
        T::headers().iter().map(|header| header.to_string()),
        options.delimiter,
    ));
    for item in items {
        lines.push(join_line(
            item.cells()
                .iter()
                .map(|cell| cell.render(options.decimal_comma)),
            options.delimiter,
        ));
    }
    Ok(lines.join("\n"))
}

pub fn export_file_name<T: Exportable>(on: NaiveDate) -> String {
    format!("{}_{}.csv", T::FILE_STEM, on.format("%Y-%m-%d"))
}

fn join_line(fields: impl Iterator<Item = String>, delimiter: char) -> String {
    fields
        .map(|field| quote(&field, delimiter))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

fn quote(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
