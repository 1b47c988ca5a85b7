//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which ties the client,
//! conversation store, and connectivity state together behind a single
//! `submit` operation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::ChatClient;
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::monitor::UNREACHABLE_MESSAGE;
use crate::observability::{STREAM_DURATION, SUBMITS, SUBMITS_FAILED, SUBMITS_REJECTED};
use crate::store::ConversationStore;
use crate::types::{ChatRequest, Message};

/// Why a submission was refused without touching the conversation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The input was empty or whitespace.
    EmptyInput,
    /// A prior submission is still in flight.
    InFlight,
    /// Connectivity is currently down.
    Disconnected,
}

/// The result of a `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The turn completed and the assistant reply is in the conversation.
    Completed,
    /// The turn failed; a synthetic assistant message describes the failure.
    Failed,
    /// The turn was cancelled; no synthetic message was appended.
    Cancelled,
    /// The submission was a no-op.
    Rejected(RejectReason),
}

/// A chat session that manages conversation state and backend interactions.
///
/// The session owns the conversation history and the in-flight flag that
/// keeps the single mutable "last message" slot single-writer. Connectivity
/// state is shared with the client (and, if one is running, the health
/// monitor) through the client's [`Connectivity`] handle.
pub struct ChatSession {
    client: ChatClient,
    store: ConversationStore,
    connectivity: Connectivity,
    in_flight: Arc<AtomicBool>,
}

impl ChatSession {
    /// Creates a new chat session around the given client.
    pub fn new(client: ChatClient) -> Self {
        let connectivity = client.connectivity().clone();
        Self {
            client,
            store: ConversationStore::new(),
            connectivity,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sends a user message and streams the assistant reply into the
    /// conversation.
    ///
    /// Equivalent to [`submit_with_cancel`] with a token nobody cancels.
    ///
    /// [`submit_with_cancel`]: ChatSession::submit_with_cancel
    pub async fn submit(&mut self, user_text: &str) -> Result<SubmitOutcome> {
        let cancel = CancellationToken::new();
        self.submit_with_cancel(user_text, &cancel).await
    }

    /// Sends a user message and streams the assistant reply into the
    /// conversation, subject to cancellation.
    ///
    /// The submission is rejected without any state change when the trimmed
    /// input is empty, a prior submission is in flight, or connectivity is
    /// down. Otherwise the user message is appended, the full history is
    /// POSTed (with retries), an empty assistant placeholder is appended, and
    /// each received fragment rewrites the placeholder so partial replies are
    /// observable between fragments.
    ///
    /// On failure a single synthetic assistant message is appended whose text
    /// distinguishes an unreachable server from other failures. Cancelling
    /// the token stops retries and stream reads at the next suspension point
    /// and appends nothing further.
    pub async fn submit_with_cancel(
        &mut self,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<SubmitOutcome> {
        SUBMITS.click();
        if user_text.trim().is_empty() {
            SUBMITS_REJECTED.click();
            return Ok(SubmitOutcome::Rejected(RejectReason::EmptyInput));
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            SUBMITS_REJECTED.click();
            return Ok(SubmitOutcome::Rejected(RejectReason::InFlight));
        }
        // Cleared on every exit path from here on, including panics below us.
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));
        if !self.connectivity.is_connected() {
            SUBMITS_REJECTED.click();
            return Ok(SubmitOutcome::Rejected(RejectReason::Disconnected));
        }

        self.store.append(Message::user(user_text));
        let request = ChatRequest::from_history(self.store.messages());

        match self.stream_turn(&request, cancel).await {
            Ok(()) => Ok(SubmitOutcome::Completed),
            Err(err) if err.is_abort() => Ok(SubmitOutcome::Cancelled),
            Err(err) => {
                SUBMITS_FAILED.click();
                let text = if err.is_unreachable() {
                    UNREACHABLE_MESSAGE.to_string()
                } else {
                    err.to_string()
                };
                self.store.append(Message::assistant(text));
                Ok(SubmitOutcome::Failed)
            }
        }
    }

    /// Issues the chat request and folds the reply stream into the
    /// conversation's last message.
    async fn stream_turn(
        &mut self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut stream = self.client.stream_chat(request, cancel).await?;

        // Placeholder only once the request succeeded; a failed request
        // leaves the user message as the last entry.
        self.store.append(Message::assistant(""));
        let start = Instant::now();
        let mut buffer = String::new();
        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(Error::abort("submission cancelled"));
                }
                item = stream.next() => item,
            };
            let Some(item) = item else {
                break;
            };
            let fragment = item?;
            buffer.push_str(&fragment.content);
            self.store.replace_last(buffer.clone())?;
        }
        STREAM_DURATION.add(start.elapsed().as_secs_f64());
        Ok(())
    }

    /// The conversation in insertion order.
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.store.len()
    }

    /// Clears the conversation history.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Whether a submission is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// The shared connectivity handle.
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }
}

struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ChatSession {
        let client = ChatClient::new("http://localhost:8000").unwrap();
        ChatSession::new(client)
    }

    #[tokio::test]
    async fn empty_input_rejected_without_state_change() {
        let mut session = session();
        session.connectivity().mark_connected();

        for input in ["", "   ", "\n\t"] {
            let outcome = session.submit(input).await.unwrap();
            assert_eq!(
                outcome,
                SubmitOutcome::Rejected(RejectReason::EmptyInput),
                "input {input:?}"
            );
        }
        assert_eq!(session.message_count(), 0);
    }

    #[tokio::test]
    async fn disconnected_rejected_without_state_change() {
        let mut session = session();
        let outcome = session.submit("Hello").await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Rejected(RejectReason::Disconnected)
        );
        assert_eq!(session.message_count(), 0);
    }

    #[tokio::test]
    async fn in_flight_rejected_without_state_change() {
        let mut session = session();
        session.connectivity().mark_connected();
        session.in_flight.store(true, Ordering::SeqCst);

        let outcome = session.submit("Hello").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Rejected(RejectReason::InFlight));
        assert_eq!(session.message_count(), 0);
        // The rejection must not clear someone else's flag.
        assert!(session.is_in_flight());
    }

    #[tokio::test]
    async fn clear_empties_history() {
        let mut session = session();
        session.store.append(Message::user("test"));
        assert_eq!(session.message_count(), 1);
        session.clear();
        assert_eq!(session.message_count(), 0);
    }
}
