//! # Table Builder
//!
//! Renders flexible search result sets as fixed-width text.
//!
//! Cells are single-line: line breaks inside a cell are folded into spaces.
//! Columns are sized by terminal display width, so wide (e.g. CJK)
//! characters take two columns.

use unicode_width::UnicodeWidthChar;

/// Separator placed between two columns
pub const COLUMN_DELIMITER: &str = " | ";

/// Collects rows and renders them as a left-aligned text table.
///
/// The first row added is the header. Rows shorter than the widest row are
/// padded with empty cells.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row
    pub fn add_row<I, S>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows
            .push(cells.into_iter().map(|cell| single_line(cell.into())).collect());
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of every column, measured in display columns
    fn column_widths(&self) -> Vec<usize> {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0; columns];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(display_width(cell));
            }
        }
        widths
    }

    pub fn render(&self) -> String {
        let widths = self.column_widths();
        let mut out = String::new();

        for row in &self.rows {
            let line = widths
                .iter()
                .enumerate()
                .map(|(i, width)| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    let padding = width.saturating_sub(display_width(cell));
                    format!("{cell}{}", " ".repeat(padding))
                })
                .collect::<Vec<_>>()
                .join(COLUMN_DELIMITER);
            out.push_str(&line);
            out.push('\n');
        }

        out
    }
}

fn display_width(cell: &str) -> usize {
    cell.chars().map(|ch| ch.width().unwrap_or(0)).sum()
}

fn single_line(cell: String) -> String {
    if cell.contains(['\n', '\r']) {
        cell.replace("\r\n", " ").replace(['\n', '\r'], " ")
    } else {
        cell
    }
}

impl std::fmt::Display for TableBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
