//! In-memory spreadsheet used by `--dry-run` and the tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{CellRange, SheetsApi, SheetsError, WorksheetRef};

/// Number of calls made to each operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get: usize,
    pub create: usize,
    pub read: usize,
    pub append: usize,
    pub border: usize,
}

impl CallCounts {
    /// Total number of API calls.
    #[must_use]
    pub fn total(&self) -> usize {
        self.get + self.create + self.read + self.append + self.border
    }
}

/// Contents of one in-memory tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySheet {
    pub worksheet: WorksheetRef,
    pub rows: Vec<Vec<String>>,
    pub bordered: Vec<CellRange>,
}

#[derive(Debug, Default)]
struct State {
    sheets: Vec<MemorySheet>,
    calls: CallCounts,
}

/// A spreadsheet that lives in process memory.
#[derive(Debug, Default)]
pub struct InMemorySheets {
    state: Mutex<State>,
    latency: Duration,
    fail_appends: AtomicBool,
    fail_borders: AtomicBool,
    lose_next_create: AtomicBool,
}

impl InMemorySheets {
    /// Creates an empty spreadsheet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call, widening race windows in concurrent tests.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes `append_row` fail until switched off.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Makes `apply_border_format` fail until switched off.
    pub fn set_fail_borders(&self, fail: bool) {
        self.fail_borders.store(fail, Ordering::SeqCst);
    }

    /// The next `create_worksheet` behaves as if another client created the
    /// tab first: the tab appears and the call reports `AlreadyExists`.
    pub fn lose_next_create(&self) {
        self.lose_next_create.store(true, Ordering::SeqCst);
    }

    /// Snapshot of a tab by title.
    #[must_use]
    pub fn sheet(&self, title: &str) -> Option<MemorySheet> {
        self.lock()
            .sheets
            .iter()
            .find(|s| s.worksheet.title == title)
            .cloned()
    }

    /// Titles of all tabs in creation order.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.lock()
            .sheets
            .iter()
            .map(|s| s.worksheet.title.clone())
            .collect()
    }

    /// Call counters so far.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl State {
    fn add_sheet(&mut self, title: &str) -> WorksheetRef {
        let worksheet = WorksheetRef {
            sheet_id: i64::try_from(self.sheets.len()).unwrap_or(i64::MAX) + 1,
            title: title.to_owned(),
        };
        self.sheets.push(MemorySheet {
            worksheet: worksheet.clone(),
            rows: Vec::new(),
            bordered: Vec::new(),
        });
        worksheet
    }

    fn sheet_mut(&mut self, worksheet: &WorksheetRef) -> Result<&mut MemorySheet, SheetsError> {
        self.sheets
            .iter_mut()
            .find(|s| s.worksheet.sheet_id == worksheet.sheet_id)
            .ok_or_else(|| SheetsError::Http {
                status: 400,
                message: format!("Unable to parse range: {}", worksheet.title),
            })
    }
}

#[async_trait]
impl SheetsApi for InMemorySheets {
    async fn get_worksheet(&self, title: &str) -> Result<Option<WorksheetRef>, SheetsError> {
        self.delay().await;
        let mut state = self.lock();
        state.calls.get += 1;
        Ok(state
            .sheets
            .iter()
            .find(|s| s.worksheet.title == title)
            .map(|s| s.worksheet.clone()))
    }

    async fn create_worksheet(
        &self,
        title: &str,
        _rows: u32,
        _columns: u32,
    ) -> Result<WorksheetRef, SheetsError> {
        self.delay().await;
        let mut state = self.lock();
        state.calls.create += 1;

        if self.lose_next_create.swap(false, Ordering::SeqCst) {
            state.add_sheet(title);
        }

        if state.sheets.iter().any(|s| s.worksheet.title == title) {
            return Err(SheetsError::AlreadyExists {
                title: title.to_owned(),
            });
        }

        debug!("In-memory worksheet '{}' created", title);
        Ok(state.add_sheet(title))
    }

    async fn read_row(
        &self,
        worksheet: &WorksheetRef,
        row: u32,
    ) -> Result<Vec<String>, SheetsError> {
        self.delay().await;
        let mut state = self.lock();
        state.calls.read += 1;

        let sheet = state.sheet_mut(worksheet)?;
        let index = usize::try_from(row).ok().and_then(|r| r.checked_sub(1));
        Ok(index
            .and_then(|i| sheet.rows.get(i))
            .cloned()
            .unwrap_or_default())
    }

    async fn append_row(
        &self,
        worksheet: &WorksheetRef,
        values: &[String],
    ) -> Result<u32, SheetsError> {
        self.delay().await;
        let mut state = self.lock();
        state.calls.append += 1;

        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(SheetsError::Unavailable("append disabled".to_owned()));
        }

        let sheet = state.sheet_mut(worksheet)?;
        sheet.rows.push(values.to_vec());
        Ok(u32::try_from(sheet.rows.len()).unwrap_or(u32::MAX))
    }

    async fn apply_border_format(
        &self,
        worksheet: &WorksheetRef,
        range: &CellRange,
    ) -> Result<(), SheetsError> {
        self.delay().await;
        let mut state = self.lock();
        state.calls.border += 1;

        if self.fail_borders.load(Ordering::SeqCst) {
            return Err(SheetsError::Unavailable("formatting disabled".to_owned()));
        }

        state.sheet_mut(worksheet)?.bordered.push(*range);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_append() {
        let sheets = InMemorySheets::new();
        let ws = sheets.create_worksheet("Май", 100, 3).await.unwrap();

        let first = sheets.append_row(&ws, &["a".to_owned()]).await.unwrap();
        let second = sheets.append_row(&ws, &["b".to_owned()]).await.unwrap();
        assert_eq!((first, second), (1, 2));

        assert_eq!(sheets.get_worksheet("Май").await.unwrap(), Some(ws));
        assert_eq!(sheets.get_worksheet("Июнь").await.unwrap(), None);
        assert_eq!(sheets.calls().total(), 5);
    }

    #[tokio::test]
    async fn test_duplicate_create() {
        let sheets = InMemorySheets::new();
        sheets.create_worksheet("Май", 100, 3).await.unwrap();
        assert!(matches!(
            sheets.create_worksheet("Май", 100, 3).await,
            Err(SheetsError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_lose_next_create() {
        let sheets = InMemorySheets::new();
        sheets.lose_next_create();
        assert!(matches!(
            sheets.create_worksheet("Май", 100, 3).await,
            Err(SheetsError::AlreadyExists { .. })
        ));
        assert_eq!(sheets.titles(), vec!["Май".to_owned()]);
    }

    #[tokio::test]
    async fn test_read_row() {
        let sheets = InMemorySheets::new();
        let ws = sheets.create_worksheet("Май", 100, 2).await.unwrap();
        assert!(sheets.read_row(&ws, 1).await.unwrap().is_empty());

        sheets
            .append_row(&ws, &["a".to_owned(), "b".to_owned()])
            .await
            .unwrap();
        assert_eq!(sheets.read_row(&ws, 1).await.unwrap(), vec!["a", "b"]);
        assert!(sheets.read_row(&ws, 0).await.unwrap().is_empty());
        assert!(sheets.read_row(&ws, 2).await.unwrap().is_empty());
        assert_eq!(sheets.calls().read, 4);
    }
}
