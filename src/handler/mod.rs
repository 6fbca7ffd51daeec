//! Message handling module.
//!
//! Turns one inbound message into one appended row and one reply.

mod message;
mod types;

pub use message::MessageHandler;
pub use types::{HandlerError, InboundMessage, Outcome, OutboundReply, Stage};
