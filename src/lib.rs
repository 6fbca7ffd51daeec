//! Sheet Logbook Bot Library
//!
//! A Telegram bot that turns free-form chat messages into spreadsheet rows.
//!
//! This crate provides the core functionality for:
//! - Describing the row layout with a validated schema
//! - Normalizing whitespace-separated messages into rows
//! - Routing rows into one worksheet per month
//! - Appending rows to Google Sheets
//! - Receiving messages and replying via Telegram
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sheet_logbook_bot::config::{MonthLabels, Schema};
//! use sheet_logbook_bot::handler::{InboundMessage, MessageHandler};
//! use sheet_logbook_bot::sheets::{InMemorySheets, SheetsApi};
//!
//! # async fn demo() {
//! let api: Arc<dyn SheetsApi> = Arc::new(InMemorySheets::new());
//! let handler = MessageHandler::new(api, Arc::new(Schema::simple()), MonthLabels::default());
//! let reply = handler.handle(&InboundMessage::now(1, "Petrov sand 12")).await;
//! println!("{}", reply.text);
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod handler;
pub mod normalize;
pub mod sheets;
pub mod telegram;
