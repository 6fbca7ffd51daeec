//! Month worksheet routing.
//!
//! Each calendar month gets its own tab, named by [`MonthLabels`]. The
//! resolve-or-create sequence runs under one lock so that concurrent
//! messages at a month rollover create a single tab with a single header.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{SheetsApi, SheetsError, WorksheetRef};
use crate::config::MonthLabels;

/// Errors raised while resolving a month worksheet.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("No worksheet label for month {0}")]
    MissingLabel(u32),

    #[error("Spreadsheet API error: {0}")]
    Upstream(#[from] SheetsError),
}

/// Resolves timestamps to month worksheets, creating them on demand.
pub struct MonthRouter {
    api: Arc<dyn SheetsApi>,
    labels: MonthLabels,
    header: Vec<String>,
    rows: u32,
    cache: Mutex<HashMap<String, WorksheetRef>>,
}

impl MonthRouter {
    /// Creates a router that writes `header` into every new worksheet.
    #[must_use]
    pub fn new(api: Arc<dyn SheetsApi>, labels: MonthLabels, header: Vec<String>) -> Self {
        Self {
            api,
            labels,
            header,
            rows: 100,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the row count of newly created worksheets.
    #[must_use]
    pub const fn with_rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    /// Month label table in use.
    #[must_use]
    pub fn labels(&self) -> &MonthLabels {
        &self.labels
    }

    /// Returns the worksheet for the month of `timestamp` (in its own
    /// timezone), creating it with a header row if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::MissingLabel`] if the month has no label and
    /// [`RouteError::Upstream`] if a spreadsheet call fails.
    pub async fn resolve<Tz: TimeZone>(
        &self,
        timestamp: &DateTime<Tz>,
    ) -> Result<WorksheetRef, RouteError> {
        let month = timestamp.month();
        let label = self
            .labels
            .label(month)
            .ok_or(RouteError::MissingLabel(month))?;
        self.resolve_label(label).await
    }

    /// Returns the worksheet with the given label, creating it if needed.
    ///
    /// An existing worksheet whose first row is empty gets the header
    /// before it is handed out, so data rows always start at row 2.
    pub async fn resolve_label(&self, label: &str) -> Result<WorksheetRef, RouteError> {
        let mut cache = self.cache.lock().await;

        if let Some(worksheet) = cache.get(label) {
            return Ok(worksheet.clone());
        }

        let worksheet = match self.api.get_worksheet(label).await? {
            Some(worksheet) => {
                debug!("Found existing worksheet {}", worksheet);
                self.ensure_header(&worksheet).await?;
                worksheet
            }
            None => self.create(label).await?,
        };

        cache.insert(label.to_owned(), worksheet.clone());
        Ok(worksheet)
    }

    /// Drops a cached handle so the next message looks the tab up again.
    pub async fn forget(&self, worksheet: &WorksheetRef) {
        let mut cache = self.cache.lock().await;
        if cache.remove(&worksheet.title).is_some() {
            debug!("Forgot cached worksheet {}", worksheet);
        }
    }

    async fn ensure_header(&self, worksheet: &WorksheetRef) -> Result<(), RouteError> {
        let first_row = self.api.read_row(worksheet, 1).await?;

        if first_row.iter().all(|cell| cell.trim().is_empty()) {
            warn!("Worksheet {} has no header row, writing it", worksheet);
            let row = self.api.append_row(worksheet, &self.header).await?;
            if row != 1 {
                warn!("Header of {} landed in row {}", worksheet, row);
            }
        } else if first_row != self.header {
            warn!(
                "Worksheet {} row 1 differs from the schema header",
                worksheet
            );
        }

        Ok(())
    }

    async fn create(&self, label: &str) -> Result<WorksheetRef, RouteError> {
        let columns = u32::try_from(self.header.len()).unwrap_or(u32::MAX);

        match self.api.create_worksheet(label, self.rows, columns).await {
            Ok(worksheet) => {
                self.api.append_row(&worksheet, &self.header).await?;
                info!("Created worksheet {} with header row", worksheet);
                Ok(worksheet)
            }
            Err(SheetsError::AlreadyExists { .. }) => {
                warn!(
                    "Worksheet '{}' was created by another client, fetching it again",
                    label
                );
                self.api.get_worksheet(label).await?.ok_or_else(|| {
                    RouteError::Upstream(SheetsError::UnexpectedResponse(format!(
                        "worksheet '{label}' reported as existing but not found"
                    )))
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for MonthRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonthRouter")
            .field("backend", &self.api.name())
            .field("columns", &self.header.len())
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}
