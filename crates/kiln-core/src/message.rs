//! Conversation message types.

use serde::{Deserialize, Serialize};

use crate::file::FileRecord;

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
}

impl MessageRole {
    /// Display label used when rendering history into a prompt.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// A single message in the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Monotonic identifier, unique within one store.
    pub id: u64,
    pub role: MessageRole,
    pub content: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Snapshot of the files produced by this turn, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileRecord>>,
}

/// One entry of the prompt-facing conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Display label: `"User"` or `"Assistant"`.
    pub role: String,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

impl From<&Message> for ConversationTurn {
    fn from(message: &Message) -> Self {
        Self::new(message.role.label(), message.content.clone())
    }
}
