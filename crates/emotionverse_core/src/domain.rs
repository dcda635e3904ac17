//! crates/emotionverse_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::persona::Persona;

/// Who authored a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Message {
    pub fn user(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp,
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp,
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// The ordered, append-only message log for one persona.
///
/// Timestamps never decrease: construction sorts, and `next_timestamp` clamps
/// new messages to the last one if the clock went backwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub persona: Persona,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(persona: Persona) -> Self {
        Self {
            persona,
            messages: Vec::new(),
        }
    }

    /// Builds a conversation from stored messages, ordering them by timestamp.
    /// The sort is stable so equal timestamps keep their storage order.
    pub fn from_messages(persona: Persona, mut messages: Vec<Message>) -> Self {
        messages.sort_by_key(|m| m.timestamp);
        Self { persona, messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn next_timestamp(&self, now: i64) -> i64 {
        self.messages
            .last()
            .map_or(now, |last| now.max(last.timestamp))
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// Represents a signed-in user - used throughout app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// The identity provider's stable subject identifier.
    pub subject: String,
    pub email: Option<String>,
}

/// What the identity provider vouches for after a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: Option<String>,
}

// Represents a browser/device login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// The signed-in state as observed by the app.
///
/// `Unknown` means the provider is still resolving and must not be confused
/// with `Absent` (signed out).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Unknown,
    Absent,
    Present(User),
}

impl Identity {
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Present(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Identity::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Identity::Unknown => "unknown",
            Identity::Absent => "absent",
            Identity::Present(_) => "present",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_messages_orders_by_timestamp_and_keeps_ties_stable() {
        let conversation = Conversation::from_messages(
            Persona::Joy,
            vec![
                Message::assistant("late", 30),
                Message::user("first tie", 10),
                Message::assistant("second tie", 10),
                Message::user("middle", 20),
            ],
        );

        let contents: Vec<&str> = conversation
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, ["first tie", "second tie", "middle", "late"]);
    }

    #[test]
    fn next_timestamp_never_goes_backwards() {
        let conversation =
            Conversation::from_messages(Persona::Peace, vec![Message::user("hi", 1_000)]);
        assert_eq!(conversation.next_timestamp(500), 1_000);
        assert_eq!(conversation.next_timestamp(2_000), 2_000);
        assert_eq!(Conversation::new(Persona::Peace).next_timestamp(42), 42);
    }

    #[test]
    fn role_serializes_as_snake_case() {
        let json = serde_json::to_string(&Message::assistant("ok", 1)).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
    }
}
