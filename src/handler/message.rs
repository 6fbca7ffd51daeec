//! Message handler implementation.
//!
//! Every message moves `Received → Normalized → Written`, or ends in
//! `Failed` at whichever step went wrong. The sender always gets exactly
//! one reply.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, error, info, warn};

use super::types::{HandlerError, InboundMessage, Outcome, OutboundReply, Stage};
use crate::config::{MonthLabels, Schema};
use crate::normalize::normalize;
use crate::sheets::{MonthRouter, RowWriter, SheetsApi};

/// Processes inbound messages against one spreadsheet.
pub struct MessageHandler {
    schema: Arc<Schema>,
    router: MonthRouter,
    writer: RowWriter,
    apply_borders: bool,
}

impl MessageHandler {
    /// Creates a handler writing rows shaped by `schema` into monthly tabs.
    #[must_use]
    pub fn new(api: Arc<dyn SheetsApi>, schema: Arc<Schema>, labels: MonthLabels) -> Self {
        Self {
            router: MonthRouter::new(Arc::clone(&api), labels, schema.header()),
            writer: RowWriter::new(api),
            schema,
            apply_borders: true,
        }
    }

    /// Enables or disables border formatting of appended rows.
    #[must_use]
    pub const fn with_borders(mut self, apply_borders: bool) -> Self {
        self.apply_borders = apply_borders;
        self
    }

    /// Sets the row count of newly created month worksheets.
    #[must_use]
    pub fn with_worksheet_rows(mut self, rows: u32) -> Self {
        self.router = self.router.with_rows(rows);
        self
    }

    /// Schema rows are shaped by.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Handles a message and builds the reply.
    pub async fn handle(&self, inbound: &InboundMessage) -> OutboundReply {
        let outcome = self.process(inbound).await;
        OutboundReply {
            sender_id: inbound.sender_id,
            text: outcome.reply_text(&self.schema),
        }
    }

    /// Handles a message using the process-local timezone for the date and
    /// month.
    pub async fn process(&self, inbound: &InboundMessage) -> Outcome {
        let local = inbound.timestamp.with_timezone(&Local);
        self.process_at(inbound.sender_id, &inbound.text, &local)
            .await
    }

    /// Handles a message as if it arrived at `time`.
    pub async fn process_at<Tz: TimeZone>(
        &self,
        sender_id: i64,
        text: &str,
        time: &DateTime<Tz>,
    ) -> Outcome {
        debug!("Message from {} {}", sender_id, Stage::Received);

        let row = match normalize(text, &self.schema, time.date_naive()) {
            Ok(row) => row,
            Err(e) => {
                info!("Message from {} {}: rejected, {}", sender_id, Stage::Failed, e);
                return Outcome::Rejected(e);
            }
        };
        debug!("Message from {} {} into {} cells", sender_id, Stage::Normalized, row.len());

        let worksheet = match self.router.resolve(time).await {
            Ok(worksheet) => worksheet,
            Err(e) => {
                error!(
                    "Message from {} {}: worksheet not resolved, {}",
                    sender_id,
                    Stage::Failed,
                    e
                );
                return Outcome::Failed(HandlerError::Route(e));
            }
        };

        match self.writer.append(&worksheet, &row, self.apply_borders).await {
            Ok(position) => {
                info!(
                    "Message from {} {} to {} at {}",
                    sender_id,
                    Stage::Written,
                    worksheet,
                    position
                );
                Outcome::Written {
                    worksheet,
                    position,
                }
            }
            Err(e) => {
                error!(
                    "Message from {} {}: append to {} failed, {}",
                    sender_id,
                    Stage::Failed,
                    worksheet,
                    e
                );
                warn!("Dropping cached handle for {}", worksheet);
                self.router.forget(&worksheet).await;
                Outcome::Failed(HandlerError::Write(e))
            }
        }
    }
}

impl std::fmt::Debug for MessageHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageHandler")
            .field("columns", &self.schema.len())
            .field("router", &self.router)
            .field("apply_borders", &self.apply_borders)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;
    use crate::config::MonthLocale;
    use crate::normalize::NormalizeError;
    use crate::sheets::InMemorySheets;

    const FULL_ENTRY: &str = "Ivanov Truck Kamaz A123 Sand 50 diesel RouteA 120 8 10 full tank checked";

    fn handler(api: &Arc<InMemorySheets>) -> MessageHandler {
        MessageHandler::new(
            Arc::clone(api) as Arc<dyn SheetsApi>,
            Arc::new(Schema::fleet()),
            MonthLabels::for_locale(MonthLocale::Ru),
        )
    }

    fn october() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-10-19T09:30:00+03:00").unwrap()
    }

    #[tokio::test]
    async fn test_full_entry_is_written() {
        let api = Arc::new(InMemorySheets::new());
        let handler = handler(&api);

        let outcome = handler.process_at(1, FULL_ENTRY, &october()).await;
        assert!(outcome.is_written());

        let sheet = api.sheet("Октябрь").unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0], Schema::fleet().header());
        assert_eq!(sheet.rows[1][0], "19.10.2026");
        assert_eq!(sheet.rows[1][1], "Ivanov");
        assert_eq!(sheet.rows[1][12], "full tank checked");
        assert_eq!(sheet.bordered[0].to_string(), "A2:M2");
    }

    #[tokio::test]
    async fn test_too_few_fields_makes_no_api_calls() {
        let api = Arc::new(InMemorySheets::new());
        let handler = handler(&api);

        let outcome = handler
            .process_at(1, "Ivanov Truck A123 Sand 50 diesel RouteA 120 8 10", &october())
            .await;
        assert!(matches!(
            outcome,
            Outcome::Rejected(NormalizeError::TooFewFields {
                required: 11,
                got: 10
            })
        ));
        assert_eq!(api.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_empty_message_reply_has_hint() {
        let api = Arc::new(InMemorySheets::new());
        let handler = handler(&api);

        let reply = handler.handle(&InboundMessage::now(42, "   ")).await;
        assert_eq!(reply.sender_id, 42);
        assert!(reply.text.contains("Формат:"));
        assert!(reply.text.contains("Водитель"));
        assert_eq!(api.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_second_message_reuses_worksheet() {
        let api = Arc::new(InMemorySheets::new());
        let handler = handler(&api);

        handler.process_at(1, FULL_ENTRY, &october()).await;
        let outcome = handler.process_at(2, FULL_ENTRY, &october()).await;

        match outcome {
            Outcome::Written { position, .. } => assert_eq!(position.0, 3),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(api.calls().create, 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_reply_and_recovery() {
        let api = Arc::new(InMemorySheets::new());
        let handler = handler(&api);

        handler.process_at(1, FULL_ENTRY, &october()).await;
        api.set_fail_appends(true);

        let failed = handler.process_at(1, FULL_ENTRY, &october()).await;
        assert!(matches!(failed, Outcome::Failed(HandlerError::Write(_))));
        assert!(failed.reply_text(handler.schema()).starts_with('❌'));

        api.set_fail_appends(false);
        let recovered = handler.process_at(1, FULL_ENTRY, &october()).await;
        assert!(recovered.is_written());
    }

    #[tokio::test]
    async fn test_header_failure_keeps_header_in_first_row() {
        let api = Arc::new(InMemorySheets::new());
        let handler = MessageHandler::new(
            Arc::clone(&api) as Arc<dyn SheetsApi>,
            Arc::new(Schema::simple()),
            MonthLabels::for_locale(MonthLocale::Ru),
        );

        api.set_fail_appends(true);
        let failed = handler.process_at(1, "Ivan sand 5", &october()).await;
        assert!(matches!(failed, Outcome::Failed(HandlerError::Route(_))));

        api.set_fail_appends(false);
        let outcome = handler.process_at(2, "Petr gravel 7", &october()).await;
        match outcome {
            Outcome::Written { position, .. } => assert_eq!(position.0, 2),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let rows = api.sheet("Октябрь").unwrap().rows;
        assert_eq!(rows[0], Schema::simple().header());
        assert_eq!(rows[1], vec!["19.10.2026", "Petr", "gravel", "7"]);
        assert_eq!(api.calls().create, 1);
    }

    #[tokio::test]
    async fn test_borders_disabled() {
        let api = Arc::new(InMemorySheets::new());
        let handler = handler(&api).with_borders(false);

        handler.process_at(1, FULL_ENTRY, &october()).await;
        assert_eq!(api.calls().border, 0);
    }

    #[tokio::test]
    async fn test_border_failure_still_succeeds() {
        let api = Arc::new(InMemorySheets::new());
        api.set_fail_borders(true);
        let handler = handler(&api);

        let outcome = handler.process_at(1, FULL_ENTRY, &october()).await;
        assert!(outcome.is_written());
    }
}
