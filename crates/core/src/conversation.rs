//! Conversation Models
//!
//! The authoritative persisted conversation shape, as returned by the
//! conversation store after a run reaches a terminal state.

use serde::{Deserialize, Serialize};

use crate::ids::ConversationId;

/// Role of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// One message in a persisted conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    /// Unique message identifier
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    /// Timestamp (RFC 3339)
    pub timestamp: String,
    /// Renderer hint ("plan", "text", ...); absent means plain text
    #[serde(default)]
    pub message_type: Option<String>,
}

impl ConversationMessage {
    /// Create a message stamped with the current time
    pub fn new(id: impl Into<String>, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            message_type: None,
        }
    }

    /// Whether this message renders in the plan tab
    pub fn is_plan(&self) -> bool {
        self.message_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("plan"))
    }
}

/// Authoritative persisted conversation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: ConversationId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    /// Last update timestamp (RFC 3339)
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ConversationRecord {
    /// Create an empty conversation record
    pub fn new(id: impl Into<ConversationId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            messages: Vec::new(),
            updated_at: None,
        }
    }

    /// The trailing message, if it is a plan-type message
    pub fn trailing_plan_message(&self) -> Option<&ConversationMessage> {
        self.messages.last().filter(|m| m.is_plan())
    }
}
