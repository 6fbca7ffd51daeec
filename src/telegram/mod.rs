//! Telegram transport module.
//!
//! Connects a bot account over `MTProto`, turns incoming messages into
//! [`InboundMessage`](crate::handler::InboundMessage)s and sends the
//! replies back. A console transport stands in for Telegram in dry runs.

mod client;
mod transport;

pub use client::{RawUpdatesReceiver, TelegramBot, TelegramError};
pub use transport::{
    CONSOLE_SENDER_ID, ConsoleTransport, TelegramTransport, Transport, TransportError, respond,
};
