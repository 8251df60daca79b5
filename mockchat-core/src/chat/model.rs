//! Conversation and message data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random id
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

opaque_id!(
    /// Opaque conversation identifier
    ConversationId
);
opaque_id!(
    /// Opaque message identifier
    MessageId
);

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Author::User => f.write_str("user"),
            Author::Assistant => f.write_str("assistant"),
        }
    }
}

/// File reference attached to a message. Only the name and media type are
/// kept; file contents never enter the chat state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub media_type: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
        }
    }

    /// Describe a file by its name, guessing the media type from the extension
    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                crate::Error::Validation(format!("not a file path: {}", path.display()))
            })?;
        let media_type = mime_guess::from_path(path).first_or_octet_stream();
        Ok(Self::new(name, media_type.essence_str()))
    }
}

/// One appended turn in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub body: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn user(body: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: MessageId::generate(),
            body: body.into(),
            author: Author::User,
            created_at: Utc::now(),
            attachments,
        }
    }

    pub fn assistant(body: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            body: body.into(),
            author: Author::Assistant,
            created_at: Utc::now(),
            attachments: Vec::new(),
        }
    }

    /// Text shown in the conversation list for this message
    pub fn preview(&self) -> String {
        let body = crate::utils::single_line(&self.body);
        if !body.is_empty() {
            return body;
        }
        match self.attachments.first() {
            Some(first) => format!("[attachment] {}", first.name),
            None => String::new(),
        }
    }
}

/// Summary of a conversation as shown in the sidebar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub last_message_preview: String,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ConversationId::generate(),
            title: title.into(),
            last_message_preview: String::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Whether a conversation is waiting on a deferred reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyState {
    Idle,
    AwaitingReply,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ConversationId::generate(), ConversationId::generate());
        assert_ne!(MessageId::generate(), MessageId::generate());
    }

    #[test]
    fn test_attachment_media_type_from_extension() {
        let png = Attachment::from_path(Path::new("/tmp/cat.png")).unwrap();
        assert_eq!(png, Attachment::new("cat.png", "image/png"));

        let unknown = Attachment::from_path(Path::new("notes.zzzq")).unwrap();
        assert_eq!(unknown.media_type, "application/octet-stream");

        assert!(Attachment::from_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_preview_prefers_text() {
        let msg = Message::user("  hello\nthere ", vec![Attachment::new("a.txt", "text/plain")]);
        assert_eq!(msg.preview(), "hello there");

        let msg = Message::user("   ", vec![Attachment::new("a.txt", "text/plain")]);
        assert_eq!(msg.preview(), "[attachment] a.txt");
    }

    #[test]
    fn test_author_serializes_lowercase() {
        let msg = Message::assistant("ok");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["author"], "assistant");
        assert!(value["id"].is_string());
    }
}
