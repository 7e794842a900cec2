//! Tabular previews for CSV and spreadsheet files.

use std::fmt::Write;

use i18n_embed_fl::fl;

use super::markup::{escape, paragraph};
use crate::LANGUAGE_LOADER;

/// Bounded table: the first row is the header, at most `max_rows` rows kept
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TablePreview {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Data rows in the source, header excluded
    pub total_rows: usize,
}

impl TablePreview {
    /// Build from row-major data. Only `max_rows` rows (header included) are
    /// kept, the rest is just counted.
    pub fn from_rows(rows: impl IntoIterator<Item = Vec<String>>, max_rows: usize) -> Self {
        let mut rows = rows.into_iter();
        let Some(header) = rows.next() else {
            return Self::default();
        };
        let keep = max_rows.saturating_sub(1);
        let mut kept = Vec::with_capacity(keep.min(1024));
        let mut total_rows = 0;
        for row in rows {
            if kept.len() < keep {
                kept.push(row);
            }
            total_rows += 1;
        }
        Self {
            header,
            rows: kept,
            total_rows,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.total_rows > self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }

    pub fn to_markup(&self) -> String {
        if self.is_empty() {
            return paragraph("carousel-table-empty", &fl!(LANGUAGE_LOADER, "preview-table-empty"));
        }

        let mut out = String::from("<div class=\"carousel-table-wrap\"><table class=\"carousel-table\"><thead><tr>");
        for cell in &self.header {
            let _ = write!(out, "<th>{}</th>", escape(cell));
        }
        out.push_str("</tr></thead><tbody>");
        for row in &self.rows {
            out.push_str("<tr>");
            for cell in row {
                let _ = write!(out, "<td>{}</td>", escape(cell));
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table>");

        if self.is_truncated() {
            out.push_str(&paragraph(
                "carousel-truncated",
                &fl!(LANGUAGE_LOADER, "preview-table-truncated", shown = self.rows.len(), total = self.total_rows),
            ));
        }
        out.push_str("</div>");
        out
    }
}

/// Split one CSV line on commas outside of quotes.
/// A quote toggles the quoted state, `""` inside quotes is a literal quote.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                cell.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(ch),
        }
    }
    cells.push(cell);
    cells
}

pub fn parse_csv(text: &str, max_rows: usize) -> TablePreview {
    let rows = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(|line| split_csv_line(line.trim()));
    TablePreview::from_rows(rows, max_rows)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpreadsheetError {
    /// Built without a spreadsheet decoder
    Unavailable,
    Decode(String),
}

/// Decode the first sheet of an xlsx/xls/ods workbook
#[cfg(feature = "spreadsheet")]
pub fn parse_spreadsheet(data: &[u8], max_rows: usize) -> Result<TablePreview, SpreadsheetError> {
    use calamine::{Reader, open_workbook_auto_from_rs};

    let mut workbook = open_workbook_auto_from_rs(std::io::Cursor::new(data.to_vec())).map_err(|err| SpreadsheetError::Decode(err.to_string()))?;
    match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => {
            let rows = range.rows().map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
            Ok(TablePreview::from_rows(rows, max_rows))
        }
        Some(Err(err)) => Err(SpreadsheetError::Decode(err.to_string())),
        None => Err(SpreadsheetError::Decode("workbook has no sheets".to_string())),
    }
}

#[cfg(not(feature = "spreadsheet"))]
pub fn parse_spreadsheet(_data: &[u8], _max_rows: usize) -> Result<TablePreview, SpreadsheetError> {
    Err(SpreadsheetError::Unavailable)
}

pub fn spreadsheet_markup(data: &[u8], max_rows: usize) -> String {
    match parse_spreadsheet(data, max_rows) {
        Ok(table) => table.to_markup(),
        Err(SpreadsheetError::Unavailable) => paragraph("carousel-error", &fl!(LANGUAGE_LOADER, "preview-spreadsheet-missing")),
        Err(SpreadsheetError::Decode(message)) => {
            log::warn!("[Renderer] Spreadsheet decode failed: {}", message);
            paragraph("carousel-error", &fl!(LANGUAGE_LOADER, "preview-spreadsheet-failed"))
        }
    }
}
