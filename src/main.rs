//! Sheet Logbook Bot - Main Entry Point
//!
//! A Telegram bot that appends each incoming message as a row to the
//! current month's worksheet of a Google spreadsheet.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Password;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use sheet_logbook_bot::config::{
    BotSettings, MonthLabels, Schema, SheetsConfig, TelegramConfig,
};
use sheet_logbook_bot::handler::MessageHandler;
use sheet_logbook_bot::sheets::{GoogleSheetsClient, InMemorySheets, SheetsApi};
use sheet_logbook_bot::telegram::{ConsoleTransport, TelegramBot, TelegramTransport, Transport};

/// Telegram bot that logs messages into monthly spreadsheet tabs.
#[derive(Parser, Debug)]
#[command(name = "logbook_bot")]
#[command(about = "Append chat messages as rows to monthly Google Sheets tabs")]
#[command(version)]
struct Args {
    /// Path to a schema JSON file (overrides SCHEMA_PATH).
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Built-in schema preset used when no file is given (fleet, simple).
    #[arg(short, long)]
    preset: Option<String>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Read messages from stdin and keep rows in memory.
    #[arg(long)]
    dry_run: bool,

    /// Do not draw borders around appended rows.
    #[arg(long)]
    no_borders: bool,

    /// Write an example schema file to the given path and exit.
    #[arg(long)]
    generate_schema: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if let Some(path) = &args.generate_schema {
        return generate_example_schema(path);
    }

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let settings = BotSettings::from_env_with_defaults()
        .context("Failed to load bot settings from environment")?;

    let schema = load_schema(&args, &settings)?;
    schema.validate().context("Schema validation failed")?;

    info!(
        "Loaded schema with {} columns ({} required)",
        schema.len(),
        schema.required_count()
    );
    info!("Message format: {}", schema.format_hint());

    let labels = match schema
        .custom_month_labels()
        .context("Invalid month labels in schema")?
    {
        Some(labels) => labels,
        None => MonthLabels::for_locale(settings.month_locale),
    };

    let apply_borders = settings.apply_borders && !args.no_borders;
    let schema = Arc::new(schema);

    if args.dry_run {
        let sheets = Arc::new(InMemorySheets::new());
        let api: Arc<dyn SheetsApi> = Arc::clone(&sheets) as Arc<dyn SheetsApi>;
        let handler = build_handler(api, schema, labels, &settings, apply_borders);

        info!("Dry run: rows are kept in memory");
        run_transport(&ConsoleTransport::new(), handler).await?;

        for title in sheets.titles() {
            if let Some(sheet) = sheets.sheet(&title) {
                info!("Worksheet '{}': {} rows", title, sheet.rows.len());
            }
        }
        return Ok(());
    }

    let sheets_config =
        SheetsConfig::from_env().context("Failed to load Sheets configuration from environment")?;
    let client = GoogleSheetsClient::from_config(&sheets_config)
        .context("Failed to create Google Sheets client")?;
    let api: Arc<dyn SheetsApi> = Arc::new(client);
    info!("Writing to spreadsheet {}", sheets_config.spreadsheet_id);

    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let bot = TelegramBot::connect(&tg_config)
        .await
        .context("Failed to connect to Telegram")?;

    if !bot.is_authorized().await.context("Failed to check authorization")? {
        authenticate(&bot, &tg_config).await?;
    }

    let bot = Arc::new(bot);
    let handler = build_handler(api, schema, labels, &settings, apply_borders);

    info!("Bot is running. Use Ctrl+C to stop.");
    let result = run_transport(&TelegramTransport::new(Arc::clone(&bot)), handler).await;

    info!("Shutting down...");
    bot.disconnect();

    result
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Picks the schema source: CLI file, `SCHEMA_PATH`, CLI preset, then
/// `SCHEMA_PRESET`.
fn load_schema(args: &Args, settings: &BotSettings) -> Result<Schema> {
    if let Some(path) = args.schema.as_ref().or(settings.schema_path.as_ref()) {
        info!("Loading schema from {}", path.display());
        return Schema::load_from_file(path)
            .with_context(|| format!("Failed to load schema from {}", path.display()));
    }

    let preset = args.preset.as_deref().unwrap_or(&settings.schema_preset);
    info!("Using built-in schema preset '{}'", preset);
    Schema::preset(preset).context("Failed to load schema preset")
}

fn build_handler(
    api: Arc<dyn SheetsApi>,
    schema: Arc<Schema>,
    labels: MonthLabels,
    settings: &BotSettings,
    apply_borders: bool,
) -> Arc<MessageHandler> {
    Arc::new(
        MessageHandler::new(api, schema, labels)
            .with_borders(apply_borders)
            .with_worksheet_rows(settings.worksheet_rows),
    )
}

/// Runs a transport until it finishes or Ctrl+C is pressed.
async fn run_transport(transport: &dyn Transport, handler: Arc<MessageHandler>) -> Result<()> {
    info!("Starting {} transport", transport.name());

    tokio::select! {
        result = transport.run(handler) => {
            result.with_context(|| format!("{} transport stopped", transport.name()))
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            Ok(())
        }
    }
}

/// Writes the example schema file.
fn generate_example_schema(path: &Path) -> Result<()> {
    Schema::example()
        .save_to_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✓ Example schema written to: {}", path.display());
    println!("\nTo use this bot:");
    println!("1. Edit the columns in {} to your liking", path.display());
    println!("2. Create a .env file with TG_API_ID, TG_API_HASH, TG_BOT_TOKEN,");
    println!("   SPREADSHEET_ID and SERVICE_ACCOUNT_FILE");
    println!("3. Run: logbook_bot --schema {}", path.display());

    Ok(())
}

/// Signs the bot in, prompting for the token if it is not configured.
async fn authenticate(bot: &TelegramBot, config: &TelegramConfig) -> Result<()> {
    info!("Authentication required");

    let token = match &config.bot_token {
        Some(token) => token.clone(),
        None => {
            warn!("TG_BOT_TOKEN is not set");
            Password::new()
                .with_prompt("Enter the bot token from @BotFather")
                .interact()?
        }
    };

    bot.bot_sign_in(&token, &config.api_hash)
        .await
        .context("Authentication failed")
}
