//! dm_client — signed, end-to-end encrypted conversation client
//!
//! The relay stores and forwards ciphertext. Everything that needs a key
//! happens here: sealing the conversation secret for each member, opening
//! it again on read, and encrypting message bodies. Every request carries a
//! recoverable signature in `x-sig` from which the relay derives the wallet.
//!
//! # Module layout
//! - `chats`     — `ChatsApi`, the operation dispatcher
//! - `cache`     — per-conversation secret cache with single-flight resolution
//! - `directory` — public key lookups
//! - `signer`    — request signing over path+query or JSON body
//! - `params`    — request parameters and validation
//! - `events`    — decoded websocket events
//! - `transport` — transport trait; `http` holds the reqwest implementation
//! - `config`    — client configuration
//! - `error`     — error types

pub mod cache;
pub mod chats;
pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod http;
pub mod params;
pub mod signer;
pub mod transport;

pub use cache::SecretCache;
pub use chats::ChatsApi;
pub use config::ClientConfig;
pub use error::{ClientError, TransportError, ValidationError};
pub use events::ChatEvent;
pub use transport::{RelayMethod, RelayRequest, RelayResponse, Transport, SIGNATURE_HEADER};
