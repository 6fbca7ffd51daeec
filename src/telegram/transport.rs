//! Message transports feeding the handler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grammers_client::client::UpdatesConfiguration;
use grammers_client::update::Update;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use super::client::{TelegramBot, TelegramError, truncate_for_log};
use crate::commands::BotCommand;
use crate::handler::{InboundMessage, MessageHandler, OutboundReply};

/// Sender id used for lines typed into the console.
pub const CONSOLE_SENDER_ID: i64 = 0;

/// First pause after an update stream error.
const UPDATE_RETRY_BASE: Duration = Duration::from_secs(1);

/// Longest pause between update stream retries.
const UPDATE_RETRY_MAX: Duration = Duration::from_secs(60);

/// Pause before polling again after `consecutive` failed polls.
///
/// A flood wait is honoured as is. Other errors back off exponentially
/// from [`UPDATE_RETRY_BASE`] up to [`UPDATE_RETRY_MAX`].
fn update_retry_delay(err: &TelegramError, consecutive: u32) -> Duration {
    if let Some(wait) = err.retry_after() {
        return wait;
    }
    let factor = 1u32 << consecutive.saturating_sub(1).min(6);
    (UPDATE_RETRY_BASE * factor).min(UPDATE_RETRY_MAX)
}

/// Errors that stop a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Telegram error: {0}")]
    Telegram(#[from] TelegramError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of inbound messages and sink for replies.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Delivers messages to `handler` until the source is exhausted.
    async fn run(&self, handler: Arc<MessageHandler>) -> Result<(), TransportError>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Answers commands directly and hands everything else to the handler.
pub async fn respond(handler: &MessageHandler, inbound: &InboundMessage) -> OutboundReply {
    if let Some(command) = BotCommand::parse(&inbound.text) {
        debug!("Command {} from {}", command, inbound.sender_id);
        return OutboundReply {
            sender_id: inbound.sender_id,
            text: command.reply(handler.schema()),
        };
    }

    handler.handle(inbound).await
}

/// Receives messages from Telegram and replies in the same chat.
#[derive(Debug)]
pub struct TelegramTransport {
    bot: Arc<TelegramBot>,
}

impl TelegramTransport {
    #[must_use]
    pub const fn new(bot: Arc<TelegramBot>) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn run(&self, handler: Arc<MessageHandler>) -> Result<(), TransportError> {
        let raw_updates = self.bot.take_updates().ok_or(TelegramError::UpdatesTaken)?;

        let mut updates = self
            .bot
            .inner()
            .stream_updates(
                raw_updates,
                UpdatesConfiguration {
                    catch_up: false,
                    ..Default::default()
                },
            )
            .await;

        info!("Listening for messages...");

        let mut failures = 0u32;
        loop {
            let update = match updates.next().await {
                Ok(update) => {
                    failures = 0;
                    update
                }
                Err(e) => {
                    let err = TelegramError::from(e);
                    failures = failures.saturating_add(1);
                    let wait = update_retry_delay(&err, failures);
                    error!(
                        "Update stream error ({} in a row): {}, retrying in {:?}",
                        failures, err, wait
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
            };

            let Update::NewMessage(message) = update else {
                continue;
            };
            if message.outgoing() {
                continue;
            }

            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let inbound = InboundMessage {
                    sender_id: message.peer_id().bot_api_dialog_id(),
                    text: message.text().to_owned(),
                    timestamp: message.date(),
                };
                debug!(
                    "Message from {}: {}",
                    inbound.sender_id,
                    truncate_for_log(&inbound.text, 50)
                );

                let reply = respond(&handler, &inbound).await;

                let mut retried = false;
                loop {
                    match message.reply(reply.text.as_str()).await {
                        Ok(_) => break,
                        Err(e) => {
                            let err = TelegramError::from(e);
                            match err.retry_after() {
                                Some(wait) if !retried => {
                                    warn!("Reply rate limited, retrying in {:?}", wait);
                                    tokio::time::sleep(wait).await;
                                    retried = true;
                                }
                                _ => {
                                    warn!("Failed to reply to {}: {}", reply.sender_id, err);
                                    break;
                                }
                            }
                        }
                    }
                }
            });
        }
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

/// Reads one message per stdin line and prints the replies.
#[derive(Debug, Default)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Processes lines from `reader` sequentially, writing each reply to
    /// `writer`. Blank lines are skipped.
    pub async fn run_with<R, W>(
        handler: &MessageHandler,
        reader: R,
        mut writer: W,
    ) -> Result<usize, TransportError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut handled = 0;

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let inbound = InboundMessage::now(CONSOLE_SENDER_ID, line);
            let reply = respond(handler, &inbound).await;

            writer.write_all(reply.text.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            handled += 1;
        }

        Ok(handled)
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn run(&self, handler: Arc<MessageHandler>) -> Result<(), TransportError> {
        info!("Reading messages from stdin, one per line (Ctrl+D to stop)");

        let stdin = BufReader::new(tokio::io::stdin());
        let handled = Self::run_with(&handler, stdin, tokio::io::stdout()).await?;

        info!("Console input closed after {} messages", handled);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
