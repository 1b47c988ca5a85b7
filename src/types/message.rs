use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Role type for a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

/// Unique identifier for a message within a process.
///
/// Pairs a wall-clock timestamp with a process-wide sequence number so two
/// messages created in the same millisecond still have distinct, totally
/// ordered ids. Ids are never reused and never reassigned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId {
    millis: i64,
    seq: u64,
}

impl MessageId {
    /// Allocates the next message id.
    pub fn next() -> Self {
        let now = OffsetDateTime::now_utc();
        let millis = (now.unix_timestamp_nanos() / 1_000_000) as i64;
        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        MessageId { millis, seq }
    }

    /// The wall-clock component, in milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.millis
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

/// A message in the conversation.
///
/// The id and role are fixed at creation; the content is mutable only while
/// the message is the in-progress assistant reply of an active stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Unique, monotonically increasing identifier.
    pub id: MessageId,

    /// Who authored the message.
    pub role: MessageRole,

    /// The text of the message.
    pub content: String,
}

impl Message {
    /// Create a new message with a freshly allocated id.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Message {
            id: MessageId::next(),
            role,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// The wire form of a message: role and content, no id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageParam {
    /// The role of the message.
    pub role: MessageRole,

    /// The content of the message.
    pub content: String,
}

impl MessageParam {
    /// Create a new `MessageParam`.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for MessageParam {
    fn from(message: &Message) -> Self {
        Self::new(message.role, message.content.clone())
    }
}
