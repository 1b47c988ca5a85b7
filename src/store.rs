//! In-memory conversation history.

use crate::error::{Error, Result};
use crate::types::Message;

/// An ordered, append-only list of messages.
///
/// The only mutation besides append is [`replace_last`], which rewrites the
/// content of the most recent entry in place; its id and role are preserved.
/// That slot is how the in-progress assistant reply grows while a stream is
/// active. There is no deletion and no reordering.
///
/// [`replace_last`]: ConversationStore::replace_last
#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to the end of the conversation.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replaces the content of the most recent message.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the store is empty.
    pub fn replace_last(&mut self, content: impl Into<String>) -> Result<()> {
        let last = self
            .messages
            .last_mut()
            .ok_or_else(|| Error::validation("replace_last on an empty conversation"))?;
        last.content = content.into();
        Ok(())
    }

    /// The conversation in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The number of messages in the conversation.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    #[test]
    fn append_preserves_order() {
        let mut store = ConversationStore::new();
        store.append(Message::user("one"));
        store.append(Message::assistant("two"));
        store.append(Message::user("three"));

        let contents: Vec<&str> = store
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn replace_last_preserves_identity() {
        let mut store = ConversationStore::new();
        store.append(Message::user("Hello"));
        store.append(Message::assistant(""));
        let id = store.messages()[1].id;

        store.replace_last("Hi").unwrap();
        store.replace_last("Hi there").unwrap();

        let last = &store.messages()[1];
        assert_eq!(last.content, "Hi there");
        assert_eq!(last.id, id);
        assert_eq!(last.role, MessageRole::Assistant);
        assert_eq!(store.messages()[0].content, "Hello");
    }

    #[test]
    fn replace_last_on_empty_store_errors() {
        let mut store = ConversationStore::new();
        assert!(store.replace_last("anything").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn clear_empties_the_conversation() {
        let mut store = ConversationStore::new();
        store.append(Message::user("Hello"));
        assert_eq!(store.len(), 1);
        store.clear();
        assert!(store.is_empty());
    }
}
