//! Google Sheets v4 REST client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::range::first_row_of;
use super::{
    CellRange, RateLimiter, ServiceAccountAuth, ServiceAccountKey, SheetsApi, SheetsError,
    WorksheetRef, quote_sheet_title,
};
use crate::config::SheetsConfig;

/// Back-off used when a 429 response carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Sheets API client bound to one spreadsheet.
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    auth: ServiceAccountAuth,
    spreadsheet_id: String,
    api_base: Url,
    rate_limiter: RateLimiter,
}

impl GoogleSheetsClient {
    /// Creates a client from configuration, loading the service account key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key file cannot be loaded or the API base
    /// URL is invalid.
    pub fn from_config(config: &SheetsConfig) -> Result<Self, SheetsError> {
        let key = ServiceAccountKey::load(&config.service_account_file)?;
        Self::new(config, ServiceAccountAuth::new(key))
    }

    /// Creates a client with an explicit authenticator.
    pub fn new(config: &SheetsConfig, auth: ServiceAccountAuth) -> Result<Self, SheetsError> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| SheetsError::InvalidUrl(format!("{}: {e}", config.api_base)))?;
        if api_base.cannot_be_a_base() {
            return Err(SheetsError::InvalidUrl(config.api_base.clone()));
        }

        info!(
            "Sheets client for spreadsheet {} as {}",
            config.spreadsheet_id,
            auth.client_email()
        );

        Ok(Self {
            http: reqwest::Client::new(),
            auth,
            spreadsheet_id: config.spreadsheet_id.clone(),
            api_base,
            rate_limiter: RateLimiter::from_millis(config.min_interval_ms),
        })
    }

    /// Builds `{base}/v4/spreadsheets/{id}{suffix}/{extra...}`.
    fn endpoint(&self, suffix: &str, extra: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v4", "spreadsheets"])
                .push(&format!("{}{suffix}", self.spreadsheet_id))
                .extend(extra);
        }
        url
    }

    /// Sends a request with auth and rate limiting, returning the JSON body.
    async fn execute(&self, request: RequestBuilder) -> Result<Value, SheetsError> {
        let waited = self.rate_limiter.wait_and_acquire().await;
        if !waited.is_zero() {
            debug!("Waited {:?} for Sheets rate limit", waited);
        }

        let token = self.auth.access_token(&self.http).await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let seconds = retry_after_secs(response.headers()).unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            self.rate_limiter.handle_retry_after(seconds).await;
            return Err(SheetsError::RateLimited(seconds));
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_owned());
            return Err(status_error(status.as_u16(), &body));
        }

        Ok(response.json().await?)
    }

    async fn batch_update(&self, requests: Value) -> Result<Value, SheetsError> {
        let url = self.endpoint(":batchUpdate", &[]);
        self.execute(self.http.post(url).json(&json!({ "requests": requests })))
            .await
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn get_worksheet(&self, title: &str) -> Result<Option<WorksheetRef>, SheetsError> {
        #[derive(Debug, Deserialize)]
        struct Spreadsheet {
            #[serde(default)]
            sheets: Vec<Sheet>,
        }

        #[derive(Debug, Deserialize)]
        struct Sheet {
            properties: SheetProperties,
        }

        let url = self.endpoint("", &[]);
        let body = self
            .execute(
                self.http
                    .get(url)
                    .query(&[("fields", "sheets.properties(sheetId,title)")]),
            )
            .await?;

        let spreadsheet: Spreadsheet = serde_json::from_value(body)
            .map_err(|e| SheetsError::UnexpectedResponse(e.to_string()))?;

        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|s| s.properties)
            .find(|p| p.title == title)
            .map(SheetProperties::into_ref))
    }

    async fn create_worksheet(
        &self,
        title: &str,
        rows: u32,
        columns: u32,
    ) -> Result<WorksheetRef, SheetsError> {
        info!("Creating worksheet '{}' ({} x {})", title, rows, columns);

        let requests = json!([{
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": rows, "columnCount": columns }
                }
            }
        }]);

        let body = self
            .batch_update(requests)
            .await
            .map_err(|e| create_conflict(title, e))?;

        added_sheet(&body)
    }

    async fn read_row(
        &self,
        worksheet: &WorksheetRef,
        row: u32,
    ) -> Result<Vec<String>, SheetsError> {
        let range = format!("{}!{row}:{row}", quote_sheet_title(&worksheet.title));
        let url = self.endpoint("", &["values", &range]);

        let body = self
            .execute(self.http.get(url).query(&[("majorDimension", "ROWS")]))
            .await?;

        Ok(first_row_values(&body))
    }

    async fn append_row(
        &self,
        worksheet: &WorksheetRef,
        values: &[String],
    ) -> Result<u32, SheetsError> {
        let range = format!("{}!A1", quote_sheet_title(&worksheet.title));
        let url = self.endpoint("", &["values", &format!("{range}:append")]);

        let body = self
            .execute(
                self.http
                    .post(url)
                    .query(&[
                        ("valueInputOption", "USER_ENTERED"),
                        ("insertDataOption", "INSERT_ROWS"),
                    ])
                    .json(&json!({ "majorDimension": "ROWS", "values": [values] })),
            )
            .await?;

        appended_row(&body)
    }

    async fn apply_border_format(
        &self,
        worksheet: &WorksheetRef,
        range: &CellRange,
    ) -> Result<(), SheetsError> {
        let border = json!({
            "style": "SOLID",
            "color": { "red": 0.0, "green": 0.0, "blue": 0.0, "alpha": 1.0 }
        });

        let requests = json!([{
            "updateBorders": {
                "range": {
                    "sheetId": worksheet.sheet_id,
                    "startRowIndex": range.start_row.saturating_sub(1),
                    "endRowIndex": range.end_row,
                    "startColumnIndex": range.start_column.saturating_sub(1),
                    "endColumnIndex": range.end_column
                },
                "top": border,
                "bottom": border,
                "left": border,
                "right": border,
                "innerHorizontal": border,
                "innerVertical": border
            }
        }]);

        self.batch_update(requests).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "google-sheets"
    }
}

impl std::fmt::Debug for GoogleSheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsClient")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("api_base", &self.api_base.as_str())
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
}

impl SheetProperties {
    fn into_ref(self) -> WorksheetRef {
        WorksheetRef {
            sheet_id: self.sheet_id,
            title: self.title,
        }
    }
}

/// Maps a non-success HTTP response to an error.
fn status_error(status: u16, body: &str) -> SheetsError {
    SheetsError::Http {
        status,
        message: api_error_message(body),
    }
}

/// Turns the "sheet already exists" rejection of `addSheet` into
/// [`SheetsError::AlreadyExists`]; other errors pass through.
fn create_conflict(title: &str, err: SheetsError) -> SheetsError {
    match err {
        SheetsError::Http { status: 400, message }
            if message.to_lowercase().contains("already exists") =>
        {
            SheetsError::AlreadyExists {
                title: title.to_owned(),
            }
        }
        other => other,
    }
}

/// Worksheet created by an `addSheet` batch update.
fn added_sheet(body: &Value) -> Result<WorksheetRef, SheetsError> {
    let properties = body
        .pointer("/replies/0/addSheet/properties")
        .cloned()
        .ok_or_else(|| SheetsError::UnexpectedResponse("addSheet reply missing".to_owned()))?;

    serde_json::from_value::<SheetProperties>(properties)
        .map(SheetProperties::into_ref)
        .map_err(|e| SheetsError::UnexpectedResponse(e.to_string()))
}

/// Row number written by a `values:append` call.
fn appended_row(body: &Value) -> Result<u32, SheetsError> {
    let updated = body
        .pointer("/updates/updatedRange")
        .and_then(Value::as_str)
        .ok_or_else(|| SheetsError::UnexpectedResponse("updatedRange missing".to_owned()))?;

    first_row_of(updated).ok_or_else(|| {
        SheetsError::UnexpectedResponse(format!("cannot parse row from range {updated}"))
    })
}

/// Cells of the first row in a `values.get` reply. Google omits `values`
/// for an empty range.
fn first_row_values(body: &Value) -> Vec<String> {
    body.pointer("/values/0")
        .and_then(Value::as_array)
        .map(|cells| {
            cells
                .iter()
                .map(|cell| match cell {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Pulls `error.message` out of a Google API error body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| {
            warn!("Non-JSON error body from Sheets API");
            body.chars().take(200).collect()
        })
}
