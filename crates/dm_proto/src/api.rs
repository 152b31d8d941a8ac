//! Read-side wire types. These map directly to JSON bodies returned by the relay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rpc::ChatPermission;

// ── Envelope ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Health {
    pub is_healthy: bool,
}

impl Default for Health {
    fn default() -> Self {
        Self { is_healthy: true }
    }
}

/// Cursor summary attached to paginated responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub prev_cursor: String,
    pub prev_count: u64,
    pub next_cursor: String,
    pub next_count: u64,
    pub total_count: u64,
}

/// Every read endpoint wraps its payload in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommsResponse<T> {
    #[serde(default)]
    pub health: Health,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    pub data: T,
}

impl<T> CommsResponse<T> {
    pub fn new(data: T) -> Self {
        Self { health: Health::default(), summary: None, data }
    }

    pub fn with_summary(data: T, summary: Summary) -> Self {
        Self { health: Health::default(), summary: Some(summary), data }
    }
}

// ── Conversations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMember {
    pub user_id: String,
}

/// One conversation as seen by the requesting user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserChat {
    pub chat_id: String,
    /// Ciphertext (base64) on the wire, plaintext once decrypted. Empty when
    /// nothing has been sent yet.
    #[serde(default)]
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    /// Sealed invite addressed to the requesting user (base64). Absent when
    /// the relay holds no invite for them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    #[serde(default)]
    pub unread_message_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub chat_members: Vec<ChatMember>,
    #[serde(default)]
    pub recheck_permissions: bool,
}

// ── Messages ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessageReaction {
    pub user_id: String,
    pub reaction: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub message_id: String,
    pub sender_user_id: String,
    /// Ciphertext (base64) on the wire, plaintext once decrypted.
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Vec<ChatMessageReaction>,
}

// ── Directory & social graph ─────────────────────────────────────────────────

/// `GET /comms/pubkey/{id}` → base64 65-byte uncompressed key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PubkeyResponse {
    #[serde(default)]
    pub data: Option<String>,
}

/// Whether the requesting user may message `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidatedChatPermissions {
    pub user_id: String,
    pub permits: ChatPermission,
    pub current_user_has_permission: bool,
}

/// Link preview from `GET /comms/unfurl`. The relay returns a bare array of
/// these, one per URL it could resolve.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnfurlMetadata {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

/// Query bounds shared by the paginated read endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl Page {
    /// Query pairs in a stable order (`limit`, `before`, `after`).
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(before) = &self.before {
            pairs.push(("before", before.clone()));
        }
        if let Some(after) = &self.after {
            pairs.push(("after", after.clone()));
        }
        pairs
    }
}
