//! Spreadsheet operations consumed by the bot.

use std::fmt;

use async_trait::async_trait;

use super::{CellRange, SheetsError};

/// Handle to one tab of the destination spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorksheetRef {
    /// Numeric tab id, used by formatting requests.
    pub sheet_id: i64,

    /// Tab title, used by value ranges.
    pub title: String,
}

impl fmt::Display for WorksheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' (#{})", self.title, self.sheet_id)
    }
}

/// Operations on a single destination spreadsheet.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Looks up a tab by title.
    async fn get_worksheet(&self, title: &str) -> Result<Option<WorksheetRef>, SheetsError>;

    /// Adds a new tab. Fails with [`SheetsError::AlreadyExists`] if the
    /// title is taken.
    async fn create_worksheet(
        &self,
        title: &str,
        rows: u32,
        columns: u32,
    ) -> Result<WorksheetRef, SheetsError>;

    /// Reads the cells of a 1-based row. An empty row yields an empty vector.
    async fn read_row(&self, worksheet: &WorksheetRef, row: u32)
    -> Result<Vec<String>, SheetsError>;

    /// Appends a row after the last non-empty row and returns its 1-based index.
    async fn append_row(&self, worksheet: &WorksheetRef, values: &[String])
    -> Result<u32, SheetsError>;

    /// Draws a solid border around every cell of the range.
    async fn apply_border_format(
        &self,
        worksheet: &WorksheetRef,
        range: &CellRange,
    ) -> Result<(), SheetsError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}
