//! Stored conversation messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who wrote a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A message that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub lead_id: String,
    pub tenant_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Name of the function the assistant called on this turn, if any.
    pub function_called: Option<String>,
}

impl NewMessage {
    /// A visitor message.
    pub fn user(tenant_id: &str, lead_id: &str, content: impl Into<String>) -> Self {
        Self {
            lead_id: lead_id.to_string(),
            tenant_id: tenant_id.to_string(),
            role: MessageRole::User,
            content: content.into(),
            function_called: None,
        }
    }

    /// An assistant reply, annotated with the function it called.
    pub fn assistant(
        tenant_id: &str,
        lead_id: &str,
        content: impl Into<String>,
        function_called: Option<String>,
    ) -> Self {
        Self {
            lead_id: lead_id.to_string(),
            tenant_id: tenant_id.to_string(),
            role: MessageRole::Assistant,
            content: content.into(),
            function_called,
        }
    }
}

/// A persisted conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub lead_id: String,
    pub tenant_id: String,
    pub role: MessageRole,
    pub content: String,
    pub function_called: Option<String>,
    pub created_at: DateTime<Utc>,
}
