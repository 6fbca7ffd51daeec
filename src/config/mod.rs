//! Configuration module for the logbook bot.
//!
//! Handles loading and validation of the row schema, the month label
//! table, and the Telegram / Google Sheets credentials.

mod months;
mod schema;
mod settings;

pub use months::{MonthLabels, MonthLabelsError, MonthLocale};
pub use schema::{DatePolicy, FieldKind, FieldSpec, Schema, SchemaError};
pub use settings::{BotSettings, ConfigError, SheetsConfig, TelegramConfig};

/// Widest schema supported by the A1 column notation (`A` ..= `ZZZ`).
pub const MAX_COLUMNS: usize = 18_278;

/// Date format used for date cells and for validating supplied dates.
pub const DATE_FORMAT: &str = "%d.%m.%Y";
