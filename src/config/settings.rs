//! Application settings, Telegram and Google Sheets configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::MonthLocale;

/// Telegram API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Bot token issued by `@BotFather`. Prompted for when absent.
    #[serde(default, skip_serializing)]
    pub bot_token: Option<String>,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("bot.session")
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String) -> Self {
        Self {
            api_id,
            api_hash,
            bot_token: None,
            session_path: default_session_path(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID` and `TG_API_HASH` to be set; `TG_BOT_TOKEN` and
    /// `TG_SESSION_PATH` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id: i32 = std::env::var("TG_API_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = std::env::var("TG_API_HASH")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_HASH"))?;

        let bot_token = std::env::var("TG_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let session_path = std::env::var("TG_SESSION_PATH")
            .map_or_else(|_| default_session_path(), PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            bot_token,
            session_path,
        })
    }
}

/// Google Sheets configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Identifier of the destination spreadsheet (from its URL).
    pub spreadsheet_id: String,

    /// Path to the service account JSON key.
    pub service_account_file: PathBuf,

    /// Base URL of the Sheets API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Minimum interval between Sheets API calls in milliseconds.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_api_base() -> String {
    "https://sheets.googleapis.com".to_owned()
}

fn default_min_interval_ms() -> u64 {
    1000 // stays under the 60 writes/minute per-user quota
}

impl SheetsConfig {
    /// Creates configuration from environment variables.
    ///
    /// Expects `SPREADSHEET_ID` and `SERVICE_ACCOUNT_FILE` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the interval
    /// is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let spreadsheet_id = std::env::var("SPREADSHEET_ID")
            .map_err(|_| ConfigError::MissingEnvVar("SPREADSHEET_ID"))?;

        let service_account_file = std::env::var("SERVICE_ACCOUNT_FILE")
            .map(PathBuf::from)
            .map_err(|_| ConfigError::MissingEnvVar("SERVICE_ACCOUNT_FILE"))?;

        let api_base = std::env::var("SHEETS_API_BASE").unwrap_or_else(|_| default_api_base());

        let min_interval_ms = parse_env_or("SHEETS_MIN_INTERVAL_MS", default_min_interval_ms())?;

        Ok(Self {
            spreadsheet_id,
            service_account_file,
            api_base,
            min_interval_ms,
        })
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Path to a schema JSON file; overrides the preset when set.
    pub schema_path: Option<PathBuf>,

    /// Built-in schema to use when no file is given.
    #[serde(default = "default_schema_preset")]
    pub schema_preset: String,

    /// Locale of the month tab names.
    #[serde(default)]
    pub month_locale: MonthLocale,

    /// Whether appended rows get a solid border.
    #[serde(default = "default_apply_borders")]
    pub apply_borders: bool,

    /// Row count of newly created worksheets.
    #[serde(default = "default_worksheet_rows")]
    pub worksheet_rows: u32,
}

fn default_schema_preset() -> String {
    "fleet".to_owned()
}

fn default_apply_borders() -> bool {
    true
}

fn default_worksheet_rows() -> u32 {
    100
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            schema_path: None,
            schema_preset: default_schema_preset(),
            month_locale: MonthLocale::default(),
            apply_borders: default_apply_borders(),
            worksheet_rows: default_worksheet_rows(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    pub fn from_env_with_defaults() -> Result<Self, ConfigError> {
        let month_locale = match std::env::var("MONTH_LOCALE") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                var: "MONTH_LOCALE",
                value,
            })?,
            Err(_) => MonthLocale::default(),
        };

        Ok(Self {
            schema_path: std::env::var("SCHEMA_PATH").ok().map(PathBuf::from),
            schema_preset: std::env::var("SCHEMA_PRESET")
                .unwrap_or_else(|_| default_schema_preset()),
            month_locale,
            apply_borders: parse_env_or("APPLY_BORDERS", default_apply_borders())?,
            worksheet_rows: parse_env_or("WORKSHEET_ROWS", default_worksheet_rows())?,
        })
    }
}

/// Reads and parses an optional environment variable.
fn parse_env_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}
