//! Standalone validator for row schema files.
//!
//! Checks a schema JSON file (or a built-in preset), prints its columns
//! and message format, and optionally runs a sample message through the
//! normalizer without touching any spreadsheet.

use std::process::ExitCode;

use chrono::Local;
use clap::Parser;

use sheet_logbook_bot::config::{DatePolicy, FieldKind, MonthLabels, MonthLocale, Schema};
use sheet_logbook_bot::normalize::normalize;

/// Row schema validator.
#[derive(Parser, Debug)]
#[command(name = "validate_schema")]
#[command(about = "Validates row schema files for the logbook bot")]
#[command(version)]
struct Args {
    /// Path to the JSON schema file to validate.
    #[arg(short, long, conflicts_with = "preset")]
    file: Option<String>,

    /// Validate a built-in preset instead of a file (fleet, simple).
    #[arg(short, long)]
    preset: Option<String>,

    /// Normalize this message against the schema and print the row.
    #[arg(short, long)]
    sample: Option<String>,

    /// Show the worksheet title for a month (number or English name).
    #[arg(short, long)]
    month: Option<String>,

    /// Month label locale used when the schema has no custom labels.
    #[arg(long, default_value = "ru")]
    locale: String,

    /// Generate an example schema file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show detailed information for each column.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(output_path) = &args.generate_example {
        return generate_example(output_path);
    }

    let schema = match load(&args) {
        Ok(schema) => schema,
        Err(e) => {
            eprintln!("✗ {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = schema.validate() {
        eprintln!("✗ Schema is invalid: {e}");
        return ExitCode::FAILURE;
    }

    print_summary(&schema, args.verbose);

    let labels = match month_labels(&schema, &args.locale) {
        Ok(labels) => labels,
        Err(e) => {
            eprintln!("✗ {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(month) = &args.month {
        match resolve_month(&labels, month) {
            Some(label) => println!("\nWorksheet for {month}: {label}"),
            None => {
                eprintln!("✗ Unknown month: {month}");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(sample) = &args.sample {
        return check_sample(&schema, sample);
    }

    ExitCode::SUCCESS
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = Schema::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example schema written to: {output_path}");
            println!("\nThe file describes {} columns.", example.len());
            println!("Edit the field names and set 'required', 'default' or 'overflow' as needed.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load(args: &Args) -> Result<Schema, String> {
    if let Some(path) = &args.file {
        println!("Validating: {path}");
        return Schema::load_from_file(path).map_err(|e| format!("Failed to load schema: {e}"));
    }

    let preset = args.preset.as_deref().unwrap_or("fleet");
    println!("Validating preset: {preset}");
    Schema::preset(preset).map_err(|e| e.to_string())
}

fn month_labels(schema: &Schema, locale: &str) -> Result<MonthLabels, String> {
    if let Some(labels) = schema.custom_month_labels().map_err(|e| e.to_string())? {
        return Ok(labels);
    }
    let locale: MonthLocale = locale
        .parse()
        .map_err(|e| format!("Invalid locale: {e}"))?;
    Ok(MonthLabels::for_locale(locale))
}

/// Accepts `1`..`12`, `jan`, `January` and so on.
fn resolve_month<'a>(labels: &'a MonthLabels, month: &str) -> Option<&'a str> {
    match month.trim().parse::<u32>() {
        Ok(number) => labels.label(number),
        Err(_) => labels.translate_english(month),
    }
}

fn print_summary(schema: &Schema, verbose: bool) {
    println!(
        "✓ Schema is valid: {} columns, {} required\n",
        schema.len(),
        schema.required_count()
    );

    if verbose {
        for (i, field) in schema.fields.iter().enumerate() {
            let kind = match &field.kind {
                FieldKind::Date {
                    policy: DatePolicy::Auto,
                } => "date, auto".to_owned(),
                FieldKind::Date { policy } => format!("date, {policy:?}").to_lowercase(),
                FieldKind::Text if field.overflow => "text, overflow".to_owned(),
                FieldKind::Text if field.is_required() => "text, required".to_owned(),
                FieldKind::Text => match &field.default {
                    Some(default) => format!("text, optional, default \"{default}\""),
                    None => "text, optional".to_owned(),
                },
            };
            println!("[{}] {} ({kind})", i + 1, field.name);
        }
        println!();
    }

    println!("Format: {}", schema.format_hint());
}

fn check_sample(schema: &Schema, sample: &str) -> ExitCode {
    println!("\nSample: {sample}");

    match normalize(sample, schema, Local::now().date_naive()) {
        Ok(row) => {
            for (field, value) in schema.fields.iter().zip(&row) {
                println!("  {}: {value}", field.name);
            }
            println!("✓ Sample fits the schema");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("✗ {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_month() {
        let labels = MonthLabels::for_locale(MonthLocale::Ru);
        assert_eq!(resolve_month(&labels, "5"), Some("Май"));
        assert_eq!(resolve_month(&labels, "feb"), Some("Февраль"));
        assert_eq!(resolve_month(&labels, "13"), None);
        assert_eq!(resolve_month(&labels, "smarch"), None);
    }
}
