//! Data types for conversations and the chat backend wire protocol.

mod chat_request;
mod message;
mod stream_fragment;

pub use chat_request::ChatRequest;
pub use message::{Message, MessageId, MessageParam, MessageRole};
pub use stream_fragment::StreamFragment;
