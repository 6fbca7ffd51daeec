//! Telegram client wrapper for a bot account.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use grammers_client::{Client, InvocationError, SenderPool, SignInError, sender};
use grammers_session::storages::SqliteSession;
use grammers_session::updates::UpdatesLike;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::TelegramConfig;

/// Raw update channel produced by the sender pool.
pub type RawUpdatesReceiver = UnboundedReceiver<UpdatesLike>;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Not authorized. Please sign in first.")]
    NotAuthorized,

    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),

    #[error("Update stream was already taken")]
    UpdatesTaken,
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        let err_str = err.to_string();

        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err_str)
    }
}

impl TelegramError {
    /// How long to wait before retrying, if Telegram asked for a pause.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::FloodWait(seconds) => Some(Duration::from_secs(u64::from(*seconds))),
            _ => None,
        }
    }
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];

    for pattern in patterns {
        if let Some(idx) = err_msg.to_lowercase().find(&pattern.to_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = err_msg[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// High-level Telegram client wrapper.
pub struct TelegramBot {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Update channel, handed out once to the transport.
    updates: Mutex<Option<RawUpdatesReceiver>>,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be opened or the
    /// connection fails.
    pub async fn connect(config: &TelegramConfig) -> Result<Self, TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        info!("Connected to Telegram. Authorized: {}", is_authorized);

        Ok(Self {
            client,
            handle: handle.thin,
            updates: Mutex::new(Some(updates)),
            _pool_task: pool_task,
        })
    }

    /// Checks if the client is authorized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check fails.
    pub async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))
    }

    /// Signs in as a bot with the token issued by `@BotFather`.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError::SignInFailed`] if the token is rejected.
    pub async fn bot_sign_in(&self, token: &str, api_hash: &str) -> Result<(), TelegramError> {
        info!("Signing in with bot token {}...", mask_token(token));

        match self.client.bot_sign_in(token, api_hash).await {
            Ok(_user) => {
                info!("Successfully signed in as bot");
                Ok(())
            }
            Err(SignInError::Other(e)) => Err(e.into()),
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Takes the raw update channel. Returns `None` on the second call.
    pub fn take_updates(&self) -> Option<RawUpdatesReceiver> {
        let taken = self
            .updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!("Update channel taken: {}", taken.is_some());
        taken
    }

    /// Returns a reference to the underlying client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot").finish_non_exhaustive()
    }
}

/// Masks a bot token for logging (keeps the numeric bot id).
fn mask_token(token: &str) -> String {
    match token.split_once(':') {
        Some((bot_id, _)) if !bot_id.is_empty() => format!("{bot_id}:***"),
        _ => "***".to_owned(),
    }
}

/// Truncates a string for logging purposes.
pub(crate) fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("123456:ABC-DEF1234ghIkl"), "123456:***");
        assert_eq!(mask_token("garbage"), "***");
        assert_eq!(mask_token(":secret"), "***");
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("Hello", 10), "Hello");
        assert_eq!(truncate_for_log("Hello, World!", 5), "Hello...");
        assert_eq!(truncate_for_log("Привет мир", 6), "Привет...");
    }

    #[test]
    fn test_extract_flood_wait() {
        assert_eq!(extract_flood_wait_seconds("FLOOD_WAIT_120"), Some(120));
        assert_eq!(extract_flood_wait_seconds("flood wait 60 seconds"), Some(60));
        assert_eq!(extract_flood_wait_seconds("some other error"), None);
    }

    #[test]
    fn test_retry_after() {
        assert_eq!(
            TelegramError::FloodWait(5).retry_after(),
            Some(Duration::from_secs(5))
        );
        assert_eq!(TelegramError::NotAuthorized.retry_after(), None);
    }
}
