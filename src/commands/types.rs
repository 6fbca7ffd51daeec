//! Command types and definitions.

use std::fmt;

use crate::config::{DatePolicy, FieldKind, Schema};

/// Slash commands answered without touching the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Greeting sent when a chat with the bot is opened.
    Start,

    /// Show help information.
    Help,

    /// Show the expected message format column by column.
    Format,

    /// Any other slash command.
    Unknown(String),
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Returns `None` if the message is not a command (does not start
    /// with `/`). A `@botname` suffix is ignored.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let after_slash = text.trim().strip_prefix('/')?;

        let word = after_slash
            .split_whitespace()
            .next()
            .unwrap_or_default();
        let cmd = word.split_once('@').map_or(word, |(cmd, _)| cmd).to_lowercase();

        Some(match cmd.as_str() {
            "start" => Self::Start,
            "help" | "h" | "?" => Self::Help,
            "format" | "fields" => Self::Format,
            _ => Self::Unknown(cmd),
        })
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Format => "format",
            Self::Unknown(name) => name,
        }
    }

    /// Returns all available commands with their descriptions.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str)> {
        vec![
            ("/start", "Приветствие и формат сообщения"),
            ("/format", "Список полей по порядку"),
            ("/help", "Эта справка"),
        ]
    }

    /// Builds the static reply for this command.
    #[must_use]
    pub fn reply(&self, schema: &Schema) -> String {
        match self {
            Self::Start => format!(
                "Привет! Отправьте данные одним сообщением, поля через пробел.\nФормат: {}",
                schema.format_hint()
            ),
            Self::Help => {
                let mut lines = vec!["Команды:".to_owned()];
                for (cmd, desc) in Self::all_commands() {
                    lines.push(format!("  {cmd} - {desc}"));
                }
                lines.push(String::new());
                lines.push(format!("Формат: {}", schema.format_hint()));
                lines.join("\n")
            }
            Self::Format => format_columns(schema),
            Self::Unknown(name) => {
                format!("Неизвестная команда /{name}. Список команд: /help")
            }
        }
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

/// Numbered column list, marking how each column is filled.
fn format_columns(schema: &Schema) -> String {
    let mut lines = vec![format!(
        "Поля (обязательных: {}):",
        schema.required_count()
    )];

    for (i, field) in schema.fields.iter().enumerate() {
        let note = match field.kind {
            FieldKind::Date {
                policy: DatePolicy::Auto,
            } => " (заполняется автоматически)",
            FieldKind::Date { .. } => " (ДД.ММ.ГГГГ, по умолчанию сегодня)",
            FieldKind::Text if field.overflow => " (всё остальное)",
            FieldKind::Text if field.is_required() => "",
            FieldKind::Text => " (необязательно)",
        };
        lines.push(format!("{}. {}{note}", i + 1, field.name));
    }

    lines.join("\n")
}
