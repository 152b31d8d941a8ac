//! Websocket frames pushed by the relay.
//!
//! Each frame is the relayed RPC plus who sent it:
//!   { "rpc": { "method": "chat.message", "params": {...} },
//!     "metadata": { "userId": "...", "timestamp": "..." } }
//!
//! `params` is kept as raw JSON so frames for methods this client does not
//! understand still parse.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRpc {
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventMetadata {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatWebsocketEventData {
    pub rpc: RawRpc,
    pub metadata: EventMetadata,
}
