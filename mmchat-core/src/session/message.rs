//! Chat message data structures

use serde::{Deserialize, Serialize};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "human")]
    Human,
    #[serde(rename = "ai")]
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Assistant => "ai",
        }
    }
}

/// A chat message as persisted in a session file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message role, stored under `type`
    #[serde(rename = "type")]
    pub role: Role,
    /// Message content
    pub content: String,
}

impl Message {
    /// Create a human message
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn is_human(&self) -> bool {
        self.role == Role::Human
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let value = serde_json::to_value(Message::assistant("hi there")).unwrap();
        assert_eq!(value, serde_json::json!({"type": "ai", "content": "hi there"}));

        let msg: Message =
            serde_json::from_str(r#"{"type":"human","content":"hello"}"#).unwrap();
        assert_eq!(msg, Message::human("hello"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = serde_json::from_str::<Message>(r#"{"type":"system","content":"x"}"#);
        assert!(result.is_err());
    }
}
