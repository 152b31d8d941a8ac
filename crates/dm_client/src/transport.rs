//! Relay transport seam.
//!
//! `ChatsApi` builds fully signed requests and hands them to a `Transport`.
//! The transport only moves bytes; it never inspects or re-serialises the
//! body, since the signature covers those exact bytes.

use async_trait::async_trait;

use crate::error::TransportError;

/// Header carrying base64(signature || recovery id).
pub const SIGNATURE_HEADER: &str = "x-sig";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub method: RelayMethod,
    /// Path plus query string, e.g. `/comms/chats?timestamp=1`.
    pub path_and_query: String,
    pub body: Option<Vec<u8>>,
    /// Value for [`SIGNATURE_HEADER`]; `None` for unsigned lookups.
    pub signature: Option<String>,
}

impl RelayRequest {
    pub fn get(path_and_query: impl Into<String>) -> Self {
        Self {
            method: RelayMethod::Get,
            path_and_query: path_and_query.into(),
            body: None,
            signature: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: RelayMethod::Post,
            path_and_query: path.into(),
            body: Some(body),
            signature: None,
        }
    }

    pub fn signed(mut self, signature: String) -> Self {
        self.signature = Some(signature);
        self
    }

    /// The path without its query string.
    pub fn path(&self) -> &str {
        self.path_and_query
            .split_once('?')
            .map_or(self.path_and_query.as_str(), |(path, _)| path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RelayResponse {
    pub fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn any non-2xx response into `TransportError::Status`.
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                status: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            })
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: RelayRequest) -> Result<RelayResponse, TransportError>;
}
