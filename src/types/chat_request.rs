use serde::{Deserialize, Serialize};

use crate::types::{Message, MessageParam};

/// The outbound chat request body: the full conversation history, newest
/// user turn last.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// Ordered conversation history.
    pub messages: Vec<MessageParam>,
}

impl ChatRequest {
    /// Create a request from an ordered slice of messages.
    pub fn from_history(history: &[Message]) -> Self {
        ChatRequest {
            messages: history.iter().map(MessageParam::from).collect(),
        }
    }
}
