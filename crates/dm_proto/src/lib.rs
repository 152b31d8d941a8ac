//! dm_proto — wire types shared between the messaging client and the relay
//!
//! Everything here is plain JSON on the wire. Ciphertext fields are carried
//! as base64 strings; this crate never touches key material.
//!
//! # Modules
//! - `api`   — response envelope and the records returned by read endpoints
//! - `rpc`   — mutation methods, their params and the signed request body
//! - `event` — frames pushed over the websocket

pub mod api;
pub mod event;
pub mod rpc;

pub use api::{
    ChatMember, ChatMessage, ChatMessageReaction, CommsResponse, Summary, UnfurlMetadata, UserChat,
};
pub use event::ChatWebsocketEventData;
pub use rpc::{ChatInvite, ChatPermission, Rpc, RpcEnvelope};
