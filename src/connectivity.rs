//! Shared connectivity state for the monitor and the request path.
//!
//! Both the health poller and the retrying request path report into one
//! [`Connectivity`] handle owned by the session, so there is no hidden global
//! flag and tests can observe transitions directly.

use std::sync::{Arc, Mutex};

/// A snapshot of the connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityState {
    /// Whether the last check or request succeeded.
    pub connected: bool,

    /// True only until the first check or request completes.
    pub checking: bool,

    /// Human-readable description of the last failure, if any.
    pub last_error: Option<String>,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        ConnectivityState {
            connected: false,
            checking: true,
            last_error: None,
        }
    }
}

/// A cloneable handle to shared connectivity state.
#[derive(Debug, Clone, Default)]
pub struct Connectivity {
    state: Arc<Mutex<ConnectivityState>>,
}

impl Connectivity {
    /// Create a new handle in the initial "checking" state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful check or request.
    pub fn mark_connected(&self) {
        let mut state = self.state.lock().expect("connectivity state poisoned");
        state.connected = true;
        state.checking = false;
        state.last_error = None;
    }

    /// Record a failed check or request.
    pub fn mark_disconnected(&self, error: impl Into<String>) {
        let mut state = self.state.lock().expect("connectivity state poisoned");
        state.connected = false;
        state.checking = false;
        state.last_error = Some(error.into());
    }

    /// Whether the most recent check or request succeeded.
    pub fn is_connected(&self) -> bool {
        self.state.lock().expect("connectivity state poisoned").connected
    }

    /// True only before the first check or request has completed.
    pub fn is_checking(&self) -> bool {
        self.state.lock().expect("connectivity state poisoned").checking
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> ConnectivityState {
        self.state.lock().expect("connectivity state poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_checking_and_disconnected() {
        let connectivity = Connectivity::new();
        let state = connectivity.snapshot();
        assert!(!state.connected);
        assert!(state.checking);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn first_outcome_clears_checking() {
        let connectivity = Connectivity::new();
        connectivity.mark_disconnected("connection refused");
        assert!(!connectivity.is_checking());
        assert!(!connectivity.is_connected());
        assert_eq!(
            connectivity.snapshot().last_error.as_deref(),
            Some("connection refused")
        );

        let connectivity = Connectivity::new();
        connectivity.mark_connected();
        assert!(!connectivity.is_checking());
        assert!(connectivity.is_connected());
    }

    #[test]
    fn reflects_most_recent_outcome() {
        let connectivity = Connectivity::new();
        for connected in [true, false, false, true, false] {
            if connected {
                connectivity.mark_connected();
            } else {
                connectivity.mark_disconnected("down");
            }
            assert_eq!(connectivity.is_connected(), connected);
        }
    }

    #[test]
    fn success_clears_last_error() {
        let connectivity = Connectivity::new();
        connectivity.mark_disconnected("down");
        connectivity.mark_connected();
        assert!(connectivity.snapshot().last_error.is_none());
    }

    #[test]
    fn clones_share_state() {
        let connectivity = Connectivity::new();
        let other = connectivity.clone();
        other.mark_connected();
        assert!(connectivity.is_connected());
    }
}
