//! Mutation RPCs posted to `/comms/mutate`.
//!
//! Body shape:
//!   { "method": "chat.message", "params": { ... },
//!     "current_user_id": "...", "timestamp": 1700000000000 }
//!
//! The exact serialised bytes are what gets signed, so the body is built once
//! and sent verbatim.

use serde::{Deserialize, Serialize};

/// Who may start a conversation with a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatPermission {
    #[default]
    All,
    Tippers,
    Followees,
    None,
}

impl ChatPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Tippers => "tippers",
            Self::Followees => "followees",
            Self::None => "none",
        }
    }
}

impl std::str::FromStr for ChatPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "tippers" => Ok(Self::Tippers),
            "followees" => Ok(Self::Followees),
            "none" => Ok(Self::None),
            other => Err(format!("unknown chat permission '{other}'")),
        }
    }
}

/// A sealed invite addressed to one participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatInvite {
    pub user_id: String,
    /// base64(sealer public key || nonce || ciphertext + tag)
    pub invite_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatCreateParams {
    pub chat_id: String,
    pub invites: Vec<ChatInvite>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatInviteParams {
    pub chat_id: String,
    pub invites: Vec<ChatInvite>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessageParams {
    pub chat_id: String,
    pub message_id: String,
    /// base64 ciphertext.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReactParams {
    pub chat_id: String,
    pub message_id: String,
    pub reaction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatIdParams {
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdParams {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatPermitParams {
    pub permit: ChatPermission,
}

/// Every mutation the relay accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "method", content = "params")]
pub enum Rpc {
    #[serde(rename = "chat.create")]
    Create(ChatCreateParams),
    #[serde(rename = "chat.invite")]
    Invite(ChatInviteParams),
    #[serde(rename = "chat.message")]
    Message(ChatMessageParams),
    #[serde(rename = "chat.react")]
    React(ChatReactParams),
    #[serde(rename = "chat.read")]
    Read(ChatIdParams),
    #[serde(rename = "chat.block")]
    Block(UserIdParams),
    #[serde(rename = "chat.unblock")]
    Unblock(UserIdParams),
    #[serde(rename = "chat.delete")]
    Delete(ChatIdParams),
    #[serde(rename = "chat.permit")]
    Permit(ChatPermitParams),
}

impl Rpc {
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Create(_) => "chat.create",
            Self::Invite(_) => "chat.invite",
            Self::Message(_) => "chat.message",
            Self::React(_) => "chat.react",
            Self::Read(_) => "chat.read",
            Self::Block(_) => "chat.block",
            Self::Unblock(_) => "chat.unblock",
            Self::Delete(_) => "chat.delete",
            Self::Permit(_) => "chat.permit",
        }
    }
}

/// Signed request body for `/comms/mutate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcEnvelope {
    #[serde(flatten)]
    pub rpc: Rpc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_id: Option<String>,
    /// Unix milliseconds at signing time.
    pub timestamp: i64,
}

impl RpcEnvelope {
    pub fn new(rpc: Rpc, current_user_id: Option<String>, timestamp: i64) -> Self {
        Self { rpc, current_user_id, timestamp }
    }

    pub fn method_name(&self) -> &'static str {
        self.rpc.method_name()
    }
}
