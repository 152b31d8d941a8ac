use dm_crypto::CryptoError;
use thiserror::Error;

/// Raised before any network or crypto work when a request is incomplete.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{operation}: missing required parameter '{field}'")]
    MissingParameter {
        operation: &'static str,
        field: &'static str,
    },

    #[error("{operation}: at least one other participant is required")]
    InsufficientParticipants { operation: &'static str },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Relay request failed: {0}")]
    Request(String),

    #[error("Relay returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("No public key registered for user {0}")]
    UnknownParticipant(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
