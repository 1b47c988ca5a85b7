//! Periodic health polling.
//!
//! The monitor owns a background task that checks `GET /health` on an
//! interval and publishes the outcome to the shared [`Connectivity`] handle.
//! Each tick is exactly one attempt with a hard deadline; resilience comes
//! from the next tick, not from retries inside a check.
//!
//! [`Connectivity`]: crate::Connectivity

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::ChatClient;
use crate::observability::{HEALTH_CHECK_FAILURES, HEALTH_CHECKS};

/// Default interval between health checks.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_millis(5000);

/// Default hard deadline for a single health check.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_millis(3000);

/// User-facing description of a backend that cannot be reached at all.
pub(crate) const UNREACHABLE_MESSAGE: &str =
    "Unable to connect to the server. Please make sure the backend is running.";

/// A handle to a running health poller.
///
/// The first check fires immediately, then once per interval. `stop` (or
/// dropping the handle) cancels the interval and any in-flight check.
#[derive(Debug)]
pub struct ConnectionMonitor {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConnectionMonitor {
    /// Start polling the backend's health endpoint.
    ///
    /// Outcomes land in the client's [`Connectivity`] handle: 2xx marks
    /// connected and clears the error; a non-success status, network error,
    /// or exceeding `check_timeout` marks disconnected with a message that
    /// distinguishes an unreachable server from other failures. The first
    /// completed check clears the `checking` flag either way.
    ///
    /// [`Connectivity`]: crate::Connectivity
    pub fn start(client: ChatClient, interval: Duration, check_timeout: Duration) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let connectivity = client.connectivity().clone();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                HEALTH_CHECKS.click();
                let outcome = tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    outcome = client.health(check_timeout) => outcome,
                };
                match outcome {
                    Ok(()) => connectivity.mark_connected(),
                    Err(err) => {
                        HEALTH_CHECK_FAILURES.click();
                        if err.is_unreachable() {
                            connectivity.mark_disconnected(UNREACHABLE_MESSAGE);
                        } else {
                            connectivity.mark_disconnected(format!("Connection error: {err}"));
                        }
                    }
                }
            }
        });
        ConnectionMonitor {
            cancel,
            task: Some(task),
        }
    }

    /// Start polling with the default interval and check timeout.
    pub fn start_with_defaults(client: ChatClient) -> Self {
        Self::start(client, DEFAULT_HEALTH_INTERVAL, DEFAULT_HEALTH_TIMEOUT)
    }

    /// Stop polling, cancelling any in-flight check.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop polling and wait for the background task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
