//! Inbound message intake. Routes raw transport messages into the group manager and the
//! command service.

use crate::adapters::transport::mapper::{is_group_id, message_to_record};
use crate::adapters::transport::payload::RawMessage;
use crate::domain::{DomainError, MessageKind};
use crate::usecases::commands::{CommandOutcome, CommandService};
use crate::usecases::group_manager::GroupManager;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IntakeSummary {
    pub stored: usize,
    pub skipped: usize,
    pub commands: usize,
}

pub struct MessageIntake {
    manager: Arc<GroupManager>,
    commands: Arc<CommandService>,
}

impl MessageIntake {
    pub fn new(manager: Arc<GroupManager>, commands: Arc<CommandService>) -> Self {
        Self { manager, commands }
    }

    /// Handle one inbound message. Non-group chats, own messages and body-less payloads are
    /// skipped. Returns whether the message was stored, and the command outcome if any.
    pub async fn deliver(&self, raw: &RawMessage) -> (bool, Option<CommandOutcome>) {
        if raw.key.from_me || !is_group_id(&raw.key.remote_jid) {
            return (false, None);
        }
        let Some(record) = message_to_record(raw, Utc::now().timestamp_millis()) else {
            debug!(id = %raw.key.id, "message without body skipped");
            return (false, None);
        };

        let group_id = record.group_id.clone();
        let sender = record.participant.clone().unwrap_or_default();
        // Image and video captions carry commands too.
        let command_text = matches!(
            record.kind,
            MessageKind::Text | MessageKind::Image | MessageKind::Video
        )
        .then(|| record.content.clone());
        let mentions = record.mentions.clone();

        self.manager.on_group_message(&group_id, record).await;

        let outcome = match command_text {
            Some(text) => self.commands.handle(&group_id, &sender, &text, &mentions).await,
            None => None,
        };
        (true, outcome)
    }

    pub async fn deliver_all(&self, messages: &[RawMessage]) -> IntakeSummary {
        let mut summary = IntakeSummary::default();
        for raw in messages {
            match self.deliver(raw).await {
                (true, outcome) => {
                    summary.stored += 1;
                    if outcome.is_some() {
                        summary.commands += 1;
                    }
                }
                (false, _) => summary.skipped += 1,
            }
        }
        info!(
            stored = summary.stored,
            skipped = summary.skipped,
            commands = summary.commands,
            "inbound batch delivered"
        );
        summary
    }
}

/// Read a JSON array of raw messages (a captured transport log).
pub async fn load_messages(path: impl AsRef<Path>) -> Result<Vec<RawMessage>, DomainError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DomainError::Config(format!("read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| DomainError::Config(format!("parse {}: {}", path.display(), e)))
}
