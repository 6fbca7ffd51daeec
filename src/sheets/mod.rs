//! Google Sheets access module.
//!
//! Provides the [`SheetsApi`] seam with a REST implementation and an
//! in-memory one, plus the month routing and row writing built on top.

mod api;
mod auth;
mod client;
mod error;
mod memory;
mod range;
mod rate_limiter;
mod router;
mod writer;

pub use api::{SheetsApi, WorksheetRef};
pub use auth::{AuthError, ServiceAccountAuth, ServiceAccountKey};
pub use client::GoogleSheetsClient;
pub use error::SheetsError;
pub use memory::{CallCounts, InMemorySheets, MemorySheet};
pub use range::{CellRange, column_letter, quote_sheet_title};
pub use rate_limiter::RateLimiter;
pub use router::{MonthRouter, RouteError};
pub use writer::{RowPosition, RowWriter, WriteError};
