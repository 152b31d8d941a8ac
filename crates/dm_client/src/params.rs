//! Caller-facing request parameters and their validation.
//!
//! Every `ChatsApi` operation validates its parameters before touching the
//! network or any key material.

use dm_proto::{api::Page, rpc::ChatPermission};

use crate::error::ValidationError;

pub trait Validate {
    fn validate(&self, operation: &'static str) -> Result<(), ValidationError>;
}

/// Ids must carry something other than whitespace.
fn required(operation: &'static str, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingParameter { operation, field });
    }
    Ok(())
}

/// Free text only has to be non-empty; whitespace is a valid message.
fn non_empty(operation: &'static str, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingParameter { operation, field });
    }
    Ok(())
}

fn participants(
    operation: &'static str,
    user_id: &str,
    invited_user_ids: &[String],
) -> Result<(), ValidationError> {
    required(operation, "user_id", user_id)?;
    if invited_user_ids.is_empty() {
        return Err(ValidationError::InsufficientParticipants { operation });
    }
    for invited in invited_user_ids {
        required(operation, "invited_user_ids", invited)?;
    }
    Ok(())
}

/// Start a conversation. `user_id` is the creator and receives an invite too.
#[derive(Debug, Clone, Default)]
pub struct CreateChat {
    pub user_id: String,
    pub invited_user_ids: Vec<String>,
}

impl Validate for CreateChat {
    fn validate(&self, operation: &'static str) -> Result<(), ValidationError> {
        participants(operation, &self.user_id, &self.invited_user_ids)
    }
}

/// Add members to an existing conversation.
#[derive(Debug, Clone, Default)]
pub struct InviteToChat {
    pub chat_id: String,
    pub user_id: String,
    pub invited_user_ids: Vec<String>,
}

impl Validate for InviteToChat {
    fn validate(&self, operation: &'static str) -> Result<(), ValidationError> {
        required(operation, "chat_id", &self.chat_id)?;
        participants(operation, &self.user_id, &self.invited_user_ids)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SendMessage {
    pub chat_id: String,
    pub message: String,
    /// Random UUID when omitted.
    pub message_id: Option<String>,
    pub parent_message_id: Option<String>,
}

impl Validate for SendMessage {
    fn validate(&self, operation: &'static str) -> Result<(), ValidationError> {
        required(operation, "chat_id", &self.chat_id)?;
        non_empty(operation, "message", &self.message)?;
        if let Some(id) = &self.message_id {
            required(operation, "message_id", id)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct React {
    pub chat_id: String,
    pub message_id: String,
    pub reaction: String,
}

impl Validate for React {
    fn validate(&self, operation: &'static str) -> Result<(), ValidationError> {
        required(operation, "chat_id", &self.chat_id)?;
        required(operation, "message_id", &self.message_id)?;
        non_empty(operation, "reaction", &self.reaction)
    }
}

/// Operations addressed to one conversation (`get`, `read`, `delete`).
#[derive(Debug, Clone, Default)]
pub struct ChatTarget {
    pub chat_id: String,
}

impl ChatTarget {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self { chat_id: chat_id.into() }
    }
}

impl Validate for ChatTarget {
    fn validate(&self, operation: &'static str) -> Result<(), ValidationError> {
        required(operation, "chat_id", &self.chat_id)
    }
}

/// Operations addressed to another user (`block`, `unblock`).
#[derive(Debug, Clone, Default)]
pub struct UserTarget {
    pub user_id: String,
}

impl UserTarget {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }
}

impl Validate for UserTarget {
    fn validate(&self, operation: &'static str) -> Result<(), ValidationError> {
        required(operation, "user_id", &self.user_id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Permit {
    pub permit: ChatPermission,
}

impl Validate for Permit {
    fn validate(&self, _operation: &'static str) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetMessages {
    pub chat_id: String,
    pub page: Page,
}

impl Validate for GetMessages {
    fn validate(&self, operation: &'static str) -> Result<(), ValidationError> {
        required(operation, "chat_id", &self.chat_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetPermissions {
    pub user_ids: Vec<String>,
}

impl Validate for GetPermissions {
    fn validate(&self, operation: &'static str) -> Result<(), ValidationError> {
        if self.user_ids.is_empty() {
            return Err(ValidationError::MissingParameter { operation, field: "user_ids" });
        }
        for id in &self.user_ids {
            required(operation, "user_ids", id)?;
        }
        Ok(())
    }
}

/// URLs to preview.
#[derive(Debug, Clone, Default)]
pub struct Unfurl {
    pub urls: Vec<String>,
}

impl Validate for Unfurl {
    fn validate(&self, operation: &'static str) -> Result<(), ValidationError> {
        if self.urls.is_empty() {
            return Err(ValidationError::MissingParameter { operation, field: "urls" });
        }
        for url in &self.urls {
            required(operation, "urls", url)?;
        }
        Ok(())
    }
}
