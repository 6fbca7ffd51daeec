//! Spreadsheet API errors.

use thiserror::Error;

use super::AuthError;

/// Errors returned by [`SheetsApi`](super::SheetsApi) implementations.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Worksheet already exists: {title}")]
    AlreadyExists { title: String },

    #[error("Rate limited by the Sheets API, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Sheets API returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected API response: {0}")]
    UnexpectedResponse(String),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
