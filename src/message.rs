use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    // System line shown inline when the Game Master could not answer.
    pub fn error(content: impl Into<String>) -> Self {
        ChatMessage {
            is_error: true,
            ..Self::new(Role::System, content)
        }
    }
}

// The conversation with the Game Master plus its rolling summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistory {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, deserialize_with = "empty_summary_as_none")]
    pub conversation_summary: Option<String>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    // Last `limit` messages with the given role, oldest first.
    pub fn last_by_role(&self, role: Role, limit: usize) -> Vec<ChatMessage> {
        let mut window: Vec<ChatMessage> = self
            .messages
            .iter()
            .rev()
            .filter(|message| message.role == role)
            .take(limit)
            .cloned()
            .collect();
        window.reverse();
        window
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.conversation_summary = None;
    }
}

// Older saves store a missing summary as "".
fn empty_summary_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let summary: Option<String> = Option::deserialize(deserializer)?;
    Ok(summary.filter(|text| !text.trim().is_empty()))
}
