//! Validation errors for incoming messages.

use thiserror::Error;

/// Reasons a message cannot be turned into a row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Too few fields: {required} required, got {got}")]
    TooFewFields { required: usize, got: usize },

    #[error("Too many fields: at most {max} allowed, got {got}")]
    TooManyFields { max: usize, got: usize },

    #[error("Field '{field}' has invalid date '{value}' (expected DD.MM.YYYY)")]
    BadDateFormat { field: String, value: String },
}

impl NormalizeError {
    /// Reply text shown to the sender, without the format hint.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyMessage => "Ошибка: пустое сообщение.".to_owned(),
            Self::TooFewFields { required, got } => format!(
                "Ошибка: слишком мало данных. Нужно минимум {required} полей, получено {got}."
            ),
            Self::TooManyFields { max, got } => format!(
                "Ошибка: слишком много данных. Допустимо не больше {max} полей, получено {got}."
            ),
            Self::BadDateFormat { field, value } => format!(
                "Ошибка: поле «{field}» содержит неверную дату «{value}». Ожидается ДД.ММ.ГГГГ."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_mentions_counts() {
        let err = NormalizeError::TooFewFields {
            required: 11,
            got: 10,
        };
        let message = err.user_message();
        assert!(message.contains("11"));
        assert!(message.contains("10"));
    }

    #[test]
    fn test_user_message_bad_date() {
        let err = NormalizeError::BadDateFormat {
            field: "Дата".to_owned(),
            value: "3.5".to_owned(),
        };
        assert!(err.user_message().contains("3.5"));
        assert!(err.user_message().contains("ДД.ММ.ГГГГ"));
    }
}
