//! Tokenizing and positional assignment of message fields.
//!
//! Assignment rules:
//! 1. Required text columns always take the next token.
//! 2. Optional columns (optional text, strict and lenient dates) take the
//!    next token only while there are more tokens than required columns.
//! 3. A lenient date takes the token only if it looks like `DD.MM.YYYY`.
//! 4. The overflow column takes every remaining surplus token.

use std::iter::Peekable;

use chrono::NaiveDate;

use super::NormalizeError;
use crate::config::{DATE_FORMAT, DatePolicy, FieldKind, FieldSpec, Schema};

/// Maps a raw message onto the schema columns.
///
/// `today` fills auto dates and date columns the message did not supply.
/// The result has exactly `schema.len()` cells.
pub fn normalize(
    raw: &str,
    schema: &Schema,
    today: NaiveDate,
) -> Result<Vec<String>, NormalizeError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(NormalizeError::EmptyMessage);
    }

    let required = schema.required_count();
    let capacity = schema.token_capacity();
    let got = tokens.len();

    if got < required {
        return Err(NormalizeError::TooFewFields { required, got });
    }

    if schema.overflow_index().is_none() && got > capacity {
        return Err(NormalizeError::TooManyFields { max: capacity, got });
    }

    let today = today.format(DATE_FORMAT).to_string();
    let mut surplus = got - required;
    let mut rest = tokens.into_iter().peekable();
    let mut row = Vec::with_capacity(schema.len());

    for field in &schema.fields {
        let value = match field.kind {
            FieldKind::Date {
                policy: DatePolicy::Auto,
            } => today.clone(),
            FieldKind::Date {
                policy: DatePolicy::Strict,
            } => match take_optional(&mut rest, &mut surplus) {
                Some(token) => parse_date(field, token)?,
                None => today.clone(),
            },
            FieldKind::Date {
                policy: DatePolicy::Lenient,
            } => {
                let supplied = surplus > 0 && rest.peek().is_some_and(|t| looks_like_date(t));
                match supplied.then(|| take_optional(&mut rest, &mut surplus)).flatten() {
                    Some(token) => parse_date(field, token)?,
                    None => today.clone(),
                }
            }
            FieldKind::Text if field.overflow => {
                let taken: Vec<&str> = rest.by_ref().take(surplus).collect();
                surplus = 0;
                taken.join(" ")
            }
            FieldKind::Text if field.is_required() => rest
                .next()
                .map(str::to_owned)
                .ok_or(NormalizeError::TooFewFields { required, got })?,
            FieldKind::Text => take_optional(&mut rest, &mut surplus)
                .map(str::to_owned)
                .unwrap_or_else(|| field.default.clone().unwrap_or_default()),
        };
        row.push(value);
    }

    // Only reachable when a lenient date declined its token and nothing
    // absorbs the shift.
    let leftover = rest.count();
    if leftover > 0 {
        return Err(NormalizeError::TooManyFields {
            max: got - leftover,
            got,
        });
    }

    Ok(row)
}

/// Returns true if the token has the exact shape `DD.MM.YYYY`.
///
/// Only the shape is checked; `31.02.2024` looks like a date but is
/// rejected later as an invalid one. `3.5` does not look like a date.
#[must_use]
pub fn looks_like_date(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'.',
            _ => b.is_ascii_digit(),
        })
}

fn take_optional<'a, I>(rest: &mut Peekable<I>, surplus: &mut usize) -> Option<&'a str>
where
    I: Iterator<Item = &'a str>,
{
    if *surplus == 0 {
        return None;
    }
    let token = rest.next()?;
    *surplus -= 1;
    Some(token)
}

fn parse_date(field: &FieldSpec, token: &str) -> Result<String, NormalizeError> {
    if looks_like_date(token) && NaiveDate::parse_from_str(token, DATE_FORMAT).is_ok() {
        Ok(token.to_owned())
    } else {
        Err(NormalizeError::BadDateFormat {
            field: field.name.clone(),
            value: token.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn plain(n: usize) -> Schema {
        Schema::new((0..n).map(|i| FieldSpec::text(format!("F{i}"))).collect())
    }

    #[test]
    fn test_empty_message() {
        let schema = Schema::fleet();
        assert_eq!(
            normalize("", &schema, today()),
            Err(NormalizeError::EmptyMessage)
        );
        assert_eq!(
            normalize(" \t\n  ", &schema, today()),
            Err(NormalizeError::EmptyMessage)
        );
    }

    #[test]
    fn test_fleet_too_few_fields() {
        let schema = Schema::fleet();
        let result = normalize(
            "Ivanov Truck A123 Sand 50 diesel RouteA 120 8 10",
            &schema,
            today(),
        );
        assert_eq!(
            result,
            Err(NormalizeError::TooFewFields {
                required: 11,
                got: 10
            })
        );
    }

    #[test]
    fn test_fleet_first_overflow_token_fills_last_required() {
        // Ten logbook values plus a three-word note: the first note word is
        // still needed for the eleventh required column.
        let schema = Schema::fleet();
        let row = normalize(
            "Ivanov Truck A123 Sand 50 diesel RouteA 120 8 10 full tank checked",
            &schema,
            today(),
        )
        .unwrap();
        assert_eq!(row.len(), 13);
        assert_eq!(row[0], "19.10.2026");
        assert_eq!(row[1], "Ivanov");
        assert_eq!(row[10], "10");
        assert_eq!(row[11], "full");
        assert_eq!(row[12], "tank checked");
    }

    #[test]
    fn test_fleet_exactly_eleven_leaves_empty_note() {
        let schema = Schema::fleet();
        let row = normalize(
            "Ivanov Truck Kamaz A123 Sand 50 diesel RouteA 120 8 10",
            &schema,
            today(),
        )
        .unwrap();
        assert_eq!(row.len(), schema.len());
        assert_eq!(row[11], "10");
        assert_eq!(row[12], "");
    }

    #[test]
    fn test_fleet_fourteen_tokens() {
        let schema = Schema::fleet();
        let row = normalize(
            "Ivanov Truck Kamaz A123 Sand 50 diesel RouteA 120 8 10 full tank checked",
            &schema,
            today(),
        )
        .unwrap();
        assert_eq!(row.len(), 13);
        assert_eq!(row[0], "19.10.2026");
        assert_eq!(row[1], "Ivanov");
        assert_eq!(row[11], "10");
        assert_eq!(row[12], "full tank checked");
    }

    #[test]
    fn test_overflow_joins_with_single_spaces() {
        let schema = Schema::new(vec![FieldSpec::text("Who"), FieldSpec::overflow("Note")]);
        let row = normalize("  Ivan   one\ttwo \n three  ", &schema, today()).unwrap();
        assert_eq!(row, vec!["Ivan", "one two three"]);
    }

    #[test]
    fn test_exact_token_count_maps_in_order() {
        for n in 1..6 {
            let schema = plain(n);
            let tokens: Vec<String> = (0..n).map(|i| format!("t{i}")).collect();
            let row = normalize(&tokens.join(" "), &schema, today()).unwrap();
            assert_eq!(row, tokens);
        }
    }

    #[test]
    fn test_too_many_without_overflow() {
        let schema = Schema::simple();
        assert_eq!(
            normalize("Ivan sand 5 extra", &schema, today()),
            Err(NormalizeError::TooManyFields { max: 3, got: 4 })
        );
    }

    #[test]
    fn test_simple_auto_date() {
        let schema = Schema::simple();
        let row = normalize("Ivan sand 5", &schema, today()).unwrap();
        assert_eq!(row, vec!["19.10.2026", "Ivan", "sand", "5"]);
    }

    #[test]
    fn test_optional_text_default() {
        let schema = Schema::new(vec![
            FieldSpec::text("Who"),
            FieldSpec::optional("Qty", "1"),
            FieldSpec::optional("Unit", ""),
        ]);
        assert_eq!(
            normalize("Ivan", &schema, today()).unwrap(),
            vec!["Ivan", "1", ""]
        );
        assert_eq!(
            normalize("Ivan 3", &schema, today()).unwrap(),
            vec!["Ivan", "3", ""]
        );
        assert_eq!(
            normalize("Ivan 3 kg", &schema, today()).unwrap(),
            vec!["Ivan", "3", "kg"]
        );
    }

    #[test]
    fn test_overflow_first_column() {
        let schema = Schema::new(vec![FieldSpec::overflow("Note"), FieldSpec::text("Total")]);
        assert_eq!(
            normalize("a b c 5", &schema, today()).unwrap(),
            vec!["a b c", "5"]
        );
        assert_eq!(normalize("5", &schema, today()).unwrap(), vec!["", "5"]);
    }

    fn strict_schema() -> Schema {
        Schema::new(vec![
            FieldSpec::date("Date", DatePolicy::Strict),
            FieldSpec::text("Who"),
            FieldSpec::text("Qty"),
        ])
    }

    #[test]
    fn test_strict_date_absent_defaults_to_today() {
        let row = normalize("Ivan 5", &strict_schema(), today()).unwrap();
        assert_eq!(row, vec!["19.10.2026", "Ivan", "5"]);
    }

    #[test]
    fn test_strict_date_supplied() {
        let row = normalize("01.09.2026 Ivan 5", &strict_schema(), today()).unwrap();
        assert_eq!(row, vec!["01.09.2026", "Ivan", "5"]);
    }

    #[test]
    fn test_strict_date_rejected() {
        for bad in ["3.5", "2026-09-01", "31.02.2026", "1.9.2026"] {
            let result = normalize(&format!("{bad} Ivan 5"), &strict_schema(), today());
            assert_eq!(
                result,
                Err(NormalizeError::BadDateFormat {
                    field: "Date".to_owned(),
                    value: bad.to_owned(),
                }),
                "input {bad}"
            );
        }
    }

    fn lenient_schema() -> Schema {
        Schema::new(vec![
            FieldSpec::text("Who"),
            FieldSpec::date("Date", DatePolicy::Lenient),
            FieldSpec::overflow("Note"),
        ])
    }

    #[test]
    fn test_lenient_date_taken_when_it_looks_like_one() {
        let row = normalize("Ivan 05.10.2026 all good", &lenient_schema(), today()).unwrap();
        assert_eq!(row, vec!["Ivan", "05.10.2026", "all good"]);
    }

    #[test]
    fn test_lenient_date_shifts_into_overflow() {
        let row = normalize("Ivan 3.5 tons delivered", &lenient_schema(), today()).unwrap();
        assert_eq!(row, vec!["Ivan", "19.10.2026", "3.5 tons delivered"]);
    }

    #[test]
    fn test_lenient_invalid_calendar_date_rejected() {
        assert!(matches!(
            normalize("Ivan 31.02.2026", &lenient_schema(), today()),
            Err(NormalizeError::BadDateFormat { .. })
        ));
    }

    #[test]
    fn test_lenient_shift_without_overflow_is_too_many() {
        let schema = Schema::new(vec![
            FieldSpec::date("Date", DatePolicy::Lenient),
            FieldSpec::text("Who"),
            FieldSpec::text("What"),
        ]);
        assert_eq!(
            normalize("Ivan sand extra", &schema, today()),
            Err(NormalizeError::TooManyFields { max: 2, got: 3 })
        );
        assert_eq!(
            normalize("Ivan sand", &schema, today()).unwrap(),
            vec!["19.10.2026", "Ivan", "sand"]
        );
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let schema = Schema::fleet();
        let text = "Ivanov Truck Kamaz A123 Sand 50 diesel RouteA 120 8 10 ok";
        let first = normalize(text, &schema, today());
        let second = normalize(text, &schema, today());
        assert_eq!(first, second);
    }

    #[test]
    fn test_looks_like_date() {
        assert!(looks_like_date("19.10.2026"));
        assert!(looks_like_date("99.99.9999"));
        assert!(!looks_like_date("3.5"));
        assert!(!looks_like_date("19/10/2026"));
        assert!(!looks_like_date("19.10.26"));
        assert!(!looks_like_date("дата"));
    }
}
