//! Month number to worksheet label mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const RUSSIAN: [&str; 12] = [
    "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь", "Июль", "Август", "Сентябрь",
    "Октябрь", "Ноябрь", "Декабрь",
];

const ENGLISH: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Errors raised when building a custom month table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonthLabelsError {
    #[error("Month table must have exactly 12 entries, got {got}")]
    WrongCount { got: usize },

    #[error("Month {month} has an empty label")]
    EmptyLabel { month: usize },

    #[error("Duplicate month label: {label}")]
    Duplicate { label: String },

    #[error("Unknown month locale: {0} (expected 'ru' or 'en')")]
    UnknownLocale(String),
}

/// Built-in month name locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonthLocale {
    #[default]
    Ru,
    En,
}

impl FromStr for MonthLocale {
    type Err = MonthLabelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ru" | "russian" => Ok(Self::Ru),
            "en" | "english" => Ok(Self::En),
            other => Err(MonthLabelsError::UnknownLocale(other.to_owned())),
        }
    }
}

impl fmt::Display for MonthLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ru => write!(f, "ru"),
            Self::En => write!(f, "en"),
        }
    }
}

/// Total mapping from month number (1-12) to a worksheet label.
///
/// The table can only be built with all twelve entries present, so lookups
/// for a valid month number never miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthLabels {
    labels: [String; 12],
}

impl MonthLabels {
    /// Returns the built-in table for a locale.
    #[must_use]
    pub fn for_locale(locale: MonthLocale) -> Self {
        let source = match locale {
            MonthLocale::Ru => &RUSSIAN,
            MonthLocale::En => &ENGLISH,
        };
        Self {
            labels: source.map(str::to_owned),
        }
    }

    /// Builds a custom table from exactly twelve labels, January first.
    pub fn from_labels(labels: &[String]) -> Result<Self, MonthLabelsError> {
        let labels: [String; 12] = labels
            .iter()
            .map(|l| l.trim().to_owned())
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|v: Vec<String>| MonthLabelsError::WrongCount { got: v.len() })?;

        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(MonthLabelsError::EmptyLabel { month: i + 1 });
            }
            if labels[..i].contains(label) {
                return Err(MonthLabelsError::Duplicate {
                    label: label.clone(),
                });
            }
        }

        Ok(Self { labels })
    }

    /// Returns the label for a 1-based month number.
    #[must_use]
    pub fn label(&self, month: u32) -> Option<&str> {
        let index = usize::try_from(month).ok()?.checked_sub(1)?;
        self.labels.get(index).map(String::as_str)
    }

    /// Translates an English month name (case-insensitive, full or
    /// three-letter form) into this table's label.
    #[must_use]
    pub fn translate_english(&self, name: &str) -> Option<&str> {
        let name = name.trim().to_lowercase();
        if name.len() < 3 {
            return None;
        }
        let index = ENGLISH
            .iter()
            .position(|m| m.to_lowercase() == name || m[..3].to_lowercase() == name)?;
        self.labels.get(index).map(String::as_str)
    }

    /// Iterates over `(month, label)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        (1u32..).zip(self.labels.iter().map(String::as_str))
    }
}

impl Default for MonthLabels {
    fn default() -> Self {
        Self::for_locale(MonthLocale::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_russian_table_is_total() {
        let labels = MonthLabels::for_locale(MonthLocale::Ru);
        for month in 1..=12 {
            assert!(labels.label(month).is_some(), "missing month {month}");
        }
        assert_eq!(labels.label(1), Some("Январь"));
        assert_eq!(labels.label(10), Some("Октябрь"));
        assert_eq!(labels.label(12), Some("Декабрь"));
    }

    #[test]
    fn test_out_of_range_month() {
        let labels = MonthLabels::default();
        assert_eq!(labels.label(0), None);
        assert_eq!(labels.label(13), None);
    }

    #[test]
    fn test_translate_english() {
        let labels = MonthLabels::for_locale(MonthLocale::Ru);
        assert_eq!(labels.translate_english("October"), Some("Октябрь"));
        assert_eq!(labels.translate_english("may"), Some("Май"));
        assert_eq!(labels.translate_english("Sep"), Some("Сентябрь"));
        assert_eq!(labels.translate_english("Smarch"), None);
        assert_eq!(labels.translate_english("Ma"), None);
    }

    #[test]
    fn test_custom_labels_wrong_count() {
        let labels = vec!["One".to_owned(); 11];
        assert_eq!(
            MonthLabels::from_labels(&labels),
            Err(MonthLabelsError::WrongCount { got: 11 })
        );
    }

    #[test]
    fn test_custom_labels_duplicate() {
        let mut labels: Vec<String> = ENGLISH.iter().map(|s| (*s).to_owned()).collect();
        labels[11] = "January".to_owned();
        assert!(matches!(
            MonthLabels::from_labels(&labels),
            Err(MonthLabelsError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_custom_labels_empty() {
        let mut labels: Vec<String> = ENGLISH.iter().map(|s| (*s).to_owned()).collect();
        labels[2] = "  ".to_owned();
        assert_eq!(
            MonthLabels::from_labels(&labels),
            Err(MonthLabelsError::EmptyLabel { month: 3 })
        );
    }

    #[test]
    fn test_locale_parse() {
        assert_eq!("RU".parse::<MonthLocale>(), Ok(MonthLocale::Ru));
        assert_eq!("english".parse::<MonthLocale>(), Ok(MonthLocale::En));
        assert!("de".parse::<MonthLocale>().is_err());
    }
}
