// Public modules
pub mod client;
pub mod connectivity;
pub mod error;
pub mod monitor;
pub mod retry;
pub mod session;
pub mod sse;
pub mod store;
pub mod types;

mod observability;

// Re-exports
pub use client::ChatClient;
pub use connectivity::{Connectivity, ConnectivityState};
pub use error::{Error, Result};
pub use monitor::{ConnectionMonitor, DEFAULT_HEALTH_INTERVAL, DEFAULT_HEALTH_TIMEOUT};
pub use observability::register_biometrics;
pub use retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, RetryPolicy};
pub use session::{ChatSession, RejectReason, SubmitOutcome};
pub use store::ConversationStore;
pub use types::*;
