//! Row schema: the ordered list of columns a message is mapped onto.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{MAX_COLUMNS, MonthLabels, MonthLabelsError};

/// Errors that can occur while loading or validating a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema has no fields")]
    NoFields,

    #[error("Field at index {index} has an empty name")]
    EmptyName { index: usize },

    #[error("Duplicate field name: {name}")]
    DuplicateName { name: String },

    #[error("Only one field may absorb overflow, found '{first}' and '{second}'")]
    MultipleOverflow { first: String, second: String },

    #[error("Overflow field '{name}' must be a text field")]
    OverflowNotText { name: String },

    #[error("Date field '{name}' cannot be required (dates default to today)")]
    RequiredDate { name: String },

    #[error("Optional field '{name}' follows the overflow field and can never be filled")]
    UnreachableField { name: String },

    #[error("Schema has {count} columns (max: {max})")]
    TooManyColumns { count: usize, max: usize },

    #[error("Invalid month labels: {0}")]
    MonthLabels(#[from] MonthLabelsError),

    #[error("Unknown schema preset: {0} (expected 'fleet' or 'simple')")]
    UnknownPreset(String),

    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse schema file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// How a date column obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePolicy {
    /// Always today's date; the message never supplies it.
    #[default]
    Auto,

    /// Optional positional token that must be `DD.MM.YYYY`.
    Strict,

    /// Optional positional token taken only if it looks like `DD.MM.YYYY`;
    /// anything else is left for the following columns.
    Lenient,
}

/// Column value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date {
        #[serde(default)]
        policy: DatePolicy,
    },
}

/// A single column of the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column header.
    pub name: String,

    /// Column value type.
    #[serde(flatten)]
    pub kind: FieldKind,

    /// Whether the message must supply this column. Unset means required
    /// for text columns and optional for dates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Value for an optional text column the message did not reach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Whether this column collects all remaining tokens.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub overflow: bool,
}

impl FieldSpec {
    /// Creates a required text column.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
            required: None,
            default: None,
            overflow: false,
        }
    }

    /// Creates an optional text column with a default value.
    #[must_use]
    pub fn optional(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            required: Some(false),
            default: Some(default.into()),
            ..Self::text(name)
        }
    }

    /// Creates the overflow (free-text note) column.
    #[must_use]
    pub fn overflow(name: impl Into<String>) -> Self {
        Self {
            overflow: true,
            ..Self::text(name)
        }
    }

    /// Creates a date column.
    #[must_use]
    pub fn date(name: impl Into<String>, policy: DatePolicy) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Date { policy },
            required: None,
            default: None,
            overflow: false,
        }
    }

    /// Whether the message must supply a token for this column.
    #[must_use]
    pub fn is_required(&self) -> bool {
        matches!(self.kind, FieldKind::Text) && self.required != Some(false) && !self.overflow
    }

    /// Whether this column takes at most one positional token.
    #[must_use]
    pub fn is_positional(&self) -> bool {
        match self.kind {
            FieldKind::Text => !self.overflow,
            FieldKind::Date { policy } => policy != DatePolicy::Auto,
        }
    }
}

/// Ordered column layout of a worksheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Columns in worksheet order.
    pub fields: Vec<FieldSpec>,

    /// Optional custom month tab names, January first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_labels: Option<Vec<String>>,
}

impl Schema {
    /// Creates a schema from a list of columns.
    #[must_use]
    pub const fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            month_labels: None,
        }
    }

    /// Vehicle logbook layout: today's date, eleven required columns and a
    /// free-text note.
    #[must_use]
    pub fn fleet() -> Self {
        Self::new(vec![
            FieldSpec::date("Дата", DatePolicy::Auto),
            FieldSpec::text("Водитель"),
            FieldSpec::text("Техника"),
            FieldSpec::text("Модель"),
            FieldSpec::text("Госномер"),
            FieldSpec::text("Груз"),
            FieldSpec::text("Заправка, л"),
            FieldSpec::text("Вид топлива"),
            FieldSpec::text("Маршрут"),
            FieldSpec::text("Пробег, км"),
            FieldSpec::text("Моточасы"),
            FieldSpec::text("Остаток топлива"),
            FieldSpec::overflow("Примечание"),
        ])
    }

    /// Short "who / what / how much" layout with an auto date.
    #[must_use]
    pub fn simple() -> Self {
        Self::new(vec![
            FieldSpec::date("Дата", DatePolicy::Auto),
            FieldSpec::text("Кто"),
            FieldSpec::text("Что"),
            FieldSpec::text("Количество"),
        ])
    }

    /// Returns a built-in schema by name.
    pub fn preset(name: &str) -> Result<Self, SchemaError> {
        match name.trim().to_lowercase().as_str() {
            "fleet" | "logbook" => Ok(Self::fleet()),
            "simple" | "short" => Ok(Self::simple()),
            other => Err(SchemaError::UnknownPreset(other.to_owned())),
        }
    }

    /// Creates an example schema for documentation purposes.
    #[must_use]
    pub fn example() -> Self {
        Self::fleet()
    }

    /// Loads a schema from a JSON file.
    ///
    /// The schema is not validated; call [`Schema::validate`] before use.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid schema
    /// document.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        let schema: Self = serde_json::from_str(&content)?;
        Ok(schema)
    }

    /// Saves the schema to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), SchemaError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the column layout.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::NoFields);
        }

        if self.fields.len() > MAX_COLUMNS {
            return Err(SchemaError::TooManyColumns {
                count: self.fields.len(),
                max: MAX_COLUMNS,
            });
        }

        let mut seen = HashSet::new();
        let mut overflow: Option<&FieldSpec> = None;

        for (index, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(SchemaError::EmptyName { index });
            }

            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateName {
                    name: field.name.clone(),
                });
            }

            if matches!(field.kind, FieldKind::Date { .. }) && field.required == Some(true) {
                return Err(SchemaError::RequiredDate {
                    name: field.name.clone(),
                });
            }

            if field.overflow {
                if field.kind != FieldKind::Text {
                    return Err(SchemaError::OverflowNotText {
                        name: field.name.clone(),
                    });
                }
                if let Some(first) = overflow {
                    return Err(SchemaError::MultipleOverflow {
                        first: first.name.clone(),
                        second: field.name.clone(),
                    });
                }
                overflow = Some(field);
            } else if overflow.is_some() && field.is_positional() && !field.is_required() {
                return Err(SchemaError::UnreachableField {
                    name: field.name.clone(),
                });
            }
        }

        if let Some(labels) = &self.month_labels {
            MonthLabels::from_labels(labels)?;
        }

        Ok(())
    }

    /// Month labels configured by this schema, if any.
    pub fn custom_month_labels(&self) -> Result<Option<MonthLabels>, SchemaError> {
        self.month_labels
            .as_deref()
            .map(MonthLabels::from_labels)
            .transpose()
            .map_err(SchemaError::from)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Minimum number of tokens a message must contain.
    #[must_use]
    pub fn required_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_required()).count()
    }

    /// Maximum number of tokens the positional columns can take.
    #[must_use]
    pub fn token_capacity(&self) -> usize {
        self.fields.iter().filter(|f| f.is_positional()).count()
    }

    /// Index of the overflow column, if any.
    #[must_use]
    pub fn overflow_index(&self) -> Option<usize> {
        self.fields.iter().position(|f| f.overflow)
    }

    /// Header row written at the top of every new worksheet.
    #[must_use]
    pub fn header(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Human-readable message format, e.g. `Кто Что Количество [Примечание...]`.
    #[must_use]
    pub fn format_hint(&self) -> String {
        self.fields
            .iter()
            .filter_map(|f| match f.kind {
                FieldKind::Date {
                    policy: DatePolicy::Auto,
                } => None,
                FieldKind::Date { .. } => Some(format!("[{} ДД.ММ.ГГГГ]", f.name)),
                FieldKind::Text if f.overflow => Some(format!("[{}...]", f.name)),
                FieldKind::Text if f.is_required() => Some(f.name.replace(' ', "_")),
                FieldKind::Text => Some(format!("[{}]", f.name)),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fleet_preset_shape() {
        let schema = Schema::fleet();
        assert!(schema.validate().is_ok());
        assert_eq!(schema.len(), 13);
        assert_eq!(schema.required_count(), 11);
        assert_eq!(schema.token_capacity(), 11);
        assert_eq!(schema.overflow_index(), Some(12));
    }

    #[test]
    fn test_simple_preset_shape() {
        let schema = Schema::simple();
        assert!(schema.validate().is_ok());
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.required_count(), 3);
        assert_eq!(schema.overflow_index(), None);
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(Schema::preset("Fleet").unwrap(), Schema::fleet());
        assert_eq!(Schema::preset("simple").unwrap(), Schema::simple());
        assert!(matches!(
            Schema::preset("bogus"),
            Err(SchemaError::UnknownPreset(_))
        ));
    }

    #[test]
    fn test_validation_no_fields() {
        let schema = Schema::new(vec![]);
        assert!(matches!(schema.validate(), Err(SchemaError::NoFields)));
    }

    #[test]
    fn test_validation_duplicate_name() {
        let schema = Schema::new(vec![FieldSpec::text("A"), FieldSpec::text("A")]);
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::DuplicateName { .. })
        ));
    }

    #[test]
    fn test_validation_multiple_overflow() {
        let schema = Schema::new(vec![FieldSpec::overflow("A"), FieldSpec::overflow("B")]);
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::MultipleOverflow { .. })
        ));
    }

    #[test]
    fn test_validation_unreachable_after_overflow() {
        let schema = Schema::new(vec![
            FieldSpec::text("Who"),
            FieldSpec::overflow("Note"),
            FieldSpec::optional("Qty", "0"),
        ]);
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::UnreachableField { .. })
        ));
    }

    #[test]
    fn test_validation_required_after_overflow_is_fine() {
        let schema = Schema::new(vec![
            FieldSpec::overflow("Note"),
            FieldSpec::text("Total"),
        ]);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_validation_bad_month_labels() {
        let mut schema = Schema::simple();
        schema.month_labels = Some(vec!["Jan".to_owned()]);
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::MonthLabels(MonthLabelsError::WrongCount { got: 1 }))
        ));
    }

    #[test]
    fn test_format_hint() {
        let schema = Schema::new(vec![
            FieldSpec::date("Date", DatePolicy::Auto),
            FieldSpec::text("Who"),
            FieldSpec::optional("Qty", "1"),
            FieldSpec::overflow("Note"),
        ]);
        assert_eq!(schema.format_hint(), "Who [Qty] [Note...]");
    }

    #[test]
    fn test_json_field_kinds() {
        let json = r#"{
            "fields": [
                {"name": "Date", "kind": "date", "policy": "lenient"},
                {"name": "Who", "kind": "text"},
                {"name": "Note", "kind": "text", "overflow": true}
            ]
        }"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(
            schema.fields[0].kind,
            FieldKind::Date {
                policy: DatePolicy::Lenient
            }
        );
        assert!(schema.fields[1].is_required());
        assert!(!schema.fields[2].is_required());
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_json_date_defaults_to_optional() {
        let json = r#"{
            "fields": [
                {"name": "Date", "kind": "date", "policy": "strict"},
                {"name": "Who", "kind": "text"}
            ]
        }"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.fields[0].required, None);
        assert!(!schema.fields[0].is_required());
        assert_eq!(schema.required_count(), 1);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_validation_required_date() {
        let json = r#"{
            "fields": [
                {"name": "Date", "kind": "date", "policy": "strict", "required": true},
                {"name": "Who", "kind": "text"}
            ]
        }"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::RequiredDate { name }) if name == "Date"
        ));
    }

    #[test]
    fn test_json_explicit_optional_text() {
        let json = r#"{"fields": [{"name": "Qty", "kind": "text", "required": false}]}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert!(!schema.fields[0].is_required());
        assert_eq!(schema.required_count(), 0);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");

        Schema::fleet().save_to_file(&path).unwrap();
        let loaded = Schema::load_from_file(&path).unwrap();
        assert_eq!(loaded, Schema::fleet());
    }
}
