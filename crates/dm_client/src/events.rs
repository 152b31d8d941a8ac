//! Decoded websocket events.

use chrono::{DateTime, Utc};
use dm_proto::api::ChatMessageReaction;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A new message, body already decrypted.
    Message {
        chat_id: String,
        message_id: String,
        sender_user_id: String,
        message: String,
        parent_message_id: Option<String>,
        sent_at: DateTime<Utc>,
    },
    Reaction {
        chat_id: String,
        message_id: String,
        reaction: ChatMessageReaction,
    },
}

/// Frame metadata timestamps are RFC 3339.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ClientError::Protocol(format!("bad event timestamp '{raw}': {e}")))
}
