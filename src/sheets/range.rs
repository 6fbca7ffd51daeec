//! A1 notation helpers.

use std::fmt;

/// Converts a 1-based column number into its letters (`1` → `A`, `27` → `AA`).
///
/// Returns an empty string for column 0.
#[must_use]
pub fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Quotes a sheet title for use in an A1 range (`'Январь'`).
#[must_use]
pub fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Extracts the first row number from an A1 range such as `'Май'!A5:M5`.
#[must_use]
pub fn first_row_of(range: &str) -> Option<u32> {
    let cells = range.rsplit_once('!').map_or(range, |(_, cells)| cells);
    let first = cells.split(':').next()?;
    let digits: String = first
        .chars()
        .skip_while(char::is_ascii_alphabetic)
        .collect();
    digits.parse().ok()
}

/// Rectangular cell range, 1-based and inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: u32,
    pub end_row: u32,
    pub start_column: usize,
    pub end_column: usize,
}

impl CellRange {
    /// Range covering the first `columns` cells of a single row.
    #[must_use]
    pub fn row(row: u32, columns: usize) -> Self {
        Self {
            start_row: row,
            end_row: row,
            start_column: 1,
            end_column: columns.max(1),
        }
    }

    /// Number of columns covered.
    #[must_use]
    pub fn width(&self) -> usize {
        self.end_column + 1 - self.start_column
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_letter(self.start_column),
            self.start_row,
            column_letter(self.end_column),
            self.end_row
        )
    }
}
