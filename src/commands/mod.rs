//! Command handling module.
//!
//! Slash commands (`/start`, `/help`, `/format`) get a static reply built
//! from the schema; everything else is treated as a data message.

mod types;

pub use types::BotCommand;
