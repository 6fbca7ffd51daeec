//! Message-to-row normalization.
//!
//! Turns a free-text message into a fixed-width worksheet row following a
//! [`Schema`](crate::config::Schema).

mod engine;
mod error;

pub use engine::{looks_like_date, normalize};
pub use error::NormalizeError;
