//! Message handling types.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::Schema;
use crate::normalize::NormalizeError;
use crate::sheets::{RouteError, RowPosition, WorksheetRef, WriteError};

/// Text message received from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Chat the reply goes to.
    pub sender_id: i64,

    /// Raw message text.
    pub text: String,

    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn now(sender_id: i64, text: impl Into<String>) -> Self {
        Self {
            sender_id,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Reply to send back to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub sender_id: i64,
    pub text: String,
}

/// Processing stage of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Normalized,
    Written,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Normalized => "normalized",
            Self::Written => "written",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Failures after a message was successfully normalized.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Worksheet routing failed: {0}")]
    Route(#[from] RouteError),

    #[error("Row write failed: {0}")]
    Write(#[from] WriteError),
}

/// Final result of handling one message.
#[derive(Debug)]
pub enum Outcome {
    /// The row was appended.
    Written {
        worksheet: WorksheetRef,
        position: RowPosition,
    },

    /// The message did not fit the schema; nothing was written.
    Rejected(NormalizeError),

    /// The spreadsheet could not be updated.
    Failed(HandlerError),
}

impl Outcome {
    /// Terminal stage of this outcome.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Written { .. } => Stage::Written,
            Self::Rejected(_) | Self::Failed(_) => Stage::Failed,
        }
    }

    /// Whether the row was written.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    /// Reply text for the sender.
    #[must_use]
    pub fn reply_text(&self, schema: &Schema) -> String {
        match self {
            Self::Written {
                worksheet,
                position,
            } => format!(
                "✅ Данные успешно добавлены (лист «{}», строка {}).",
                worksheet.title, position.0
            ),
            Self::Rejected(err) => format!(
                "{}\nФормат: {}",
                err.user_message(),
                schema.format_hint()
            ),
            Self::Failed(_) => "❌ Ошибка при добавлении данных в таблицу.".to_owned(),
        }
    }
}
