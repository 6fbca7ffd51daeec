//! Appending rows to a worksheet.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::{CellRange, SheetsApi, SheetsError, WorksheetRef};

/// Errors raised while writing a row.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to append row: {0}")]
    Upstream(#[from] SheetsError),
}

/// 1-based index of a written row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RowPosition(pub u32);

impl fmt::Display for RowPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0)
    }
}

/// Appends normalized rows and optionally frames them with borders.
pub struct RowWriter {
    api: Arc<dyn SheetsApi>,
}

impl RowWriter {
    #[must_use]
    pub fn new(api: Arc<dyn SheetsApi>) -> Self {
        Self { api }
    }

    /// Appends `row` to the end of the worksheet.
    ///
    /// Border formatting is cosmetic: its failure is logged and the append
    /// is still reported as successful.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Upstream`] if the append call fails.
    pub async fn append(
        &self,
        worksheet: &WorksheetRef,
        row: &[String],
        apply_borders: bool,
    ) -> Result<RowPosition, WriteError> {
        let index = self.api.append_row(worksheet, row).await?;
        debug!("Appended row {} to {}", index, worksheet);

        if apply_borders {
            let range = CellRange::row(index, row.len());
            if let Err(e) = self.api.apply_border_format(worksheet, &range).await {
                warn!(
                    "Failed to apply borders to {} in {}: {}",
                    range, worksheet, e
                );
            }
        }

        Ok(RowPosition(index))
    }
}

impl fmt::Debug for RowWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowWriter")
            .field("backend", &self.api.name())
            .finish()
    }
}
