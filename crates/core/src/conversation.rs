//! Conversation history and the request envelope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::id::MessageId;
use crate::Time;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Written by the person asking
    User,
    /// Produced by a model
    Assistant,
    /// Instructions injected by the host
    System,
}

impl MessageRole {
    /// Lowercase name, also used as a document tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Unique identifier
    pub id: MessageId,

    /// Owning project, if scoped
    #[serde(default)]
    pub project_id: Option<String>,

    /// Author role
    pub role: MessageRole,

    /// Message kind, e.g. "text" or "code"
    pub message_type: String,

    /// Text content
    pub content: String,

    /// When the message was created
    pub created_at: Time,

    /// Generated files attached to the message, keyed by path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, String>>,
}

impl ConversationMessage {
    /// Create a text message stamped now.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            project_id: None,
            role,
            message_type: "text".to_string(),
            content: content.into(),
            created_at: chrono::Utc::now(),
            files: None,
        }
    }

    /// Scope to a project.
    pub fn in_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the message type.
    pub fn with_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = message_type.into();
        self
    }

    /// Attach a generated file.
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files
            .get_or_insert_with(BTreeMap::new)
            .insert(path.into(), content.into());
        self
    }
}

/// Request envelope for a composite model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelContext {
    /// Project the request belongs to
    pub project_id: String,

    /// Earlier turns, oldest first
    #[serde(default)]
    pub previous_messages: Vec<ConversationMessage>,

    /// The user's request
    pub user_query: String,

    /// Free-form extra context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<serde_json::Value>,
}

impl ModelContext {
    /// Create a context with no history.
    pub fn new(project_id: impl Into<String>, user_query: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            previous_messages: Vec::new(),
            user_query: user_query.into(),
            additional_context: None,
        }
    }

    /// Set history from a newest-first fetch, storing it oldest first.
    pub fn with_recent_messages(mut self, mut newest_first: Vec<ConversationMessage>) -> Self {
        newest_first.reverse();
        self.previous_messages = newest_first;
        self
    }

    /// Attach free-form context.
    pub fn with_additional_context(mut self, value: serde_json::Value) -> Self {
        self.additional_context = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_messages_are_reversed() {
        let newer = ConversationMessage::new(MessageRole::Assistant, "second");
        let older = ConversationMessage::new(MessageRole::User, "first");
        let ctx = ModelContext::new("p1", "q").with_recent_messages(vec![newer, older]);
        assert_eq!(ctx.previous_messages[0].content, "first");
        assert_eq!(ctx.previous_messages[1].content, "second");
    }

    #[test]
    fn test_with_file_collects_files() {
        let msg = ConversationMessage::new(MessageRole::Assistant, "done")
            .with_file("src/App.tsx", "export default App;")
            .with_file("src/index.css", "body {}");
        assert_eq!(msg.files.as_ref().map(|f| f.len()), Some(2));
    }
}
