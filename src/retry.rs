//! Bounded fixed-delay retry.
//!
//! The retry loop is generic over the operation so the attempt accounting can
//! be tested without HTTP in the way. [`crate::ChatClient`] instantiates it
//! over the chat POST.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::observability::CHAT_REQUEST_RETRIES;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Policy for the retry loop: a retry budget and a fixed inter-attempt delay.
///
/// `max_retries` counts retries, not attempts; the loop makes at most
/// `max_retries + 1` attempts in total. The delay is fixed, not exponential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,

    /// Fixed delay between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the default budget and delay.
    pub fn new() -> Self {
        RetryPolicy {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Sets the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the inter-attempt delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `attempt` under the policy until it succeeds, the budget is spent, or
/// the token is cancelled.
///
/// The token is checked before every attempt and raced against the delay
/// sleep, so an abandoned operation stops at its next suspension point.
/// Exhaustion wraps the final attempt's error in
/// [`Error::ExhaustedRetries`]; cancellation yields [`Error::Abort`].
pub async fn run<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_retries.saturating_add(1);
    let mut last_err = None;
    for round in 0..attempts {
        if cancel.is_cancelled() {
            return Err(Error::abort("retry loop cancelled"));
        }
        if round > 0 {
            CHAT_REQUEST_RETRIES.click();
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(Error::abort("retry loop cancelled"));
                }
                _ = tokio::time::sleep(policy.delay) => {}
            }
        }
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_err = Some(err);
            }
        }
    }
    match last_err {
        Some(err) => Err(Error::exhausted_retries(attempts, err)),
        None => Err(Error::abort("retry loop made no attempts")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_attempts(
        counter: Arc<AtomicU32>,
        succeed_on: Option<u32>,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<u32>> + Send>> {
        move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                match succeed_on {
                    Some(k) if n >= k => Ok(n),
                    _ => Err(Error::api(500, "boom")),
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_makes_max_plus_one_attempts() {
        let policy = RetryPolicy::new().with_max_retries(3);
        let cancel = CancellationToken::new();
        let counter = Arc::new(AtomicU32::new(0));

        let result = run(&policy, &cancel, counting_attempts(Arc::clone(&counter), None)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 4);
        match result {
            Err(Error::ExhaustedRetries { attempts, source }) => {
                assert_eq!(attempts, 4);
                assert_eq!(source.status_code(), Some(500));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_short_circuits() {
        let policy = RetryPolicy::new().with_max_retries(3);
        let cancel = CancellationToken::new();
        let counter = Arc::new(AtomicU32::new(0));

        let result = run(
            &policy,
            &cancel,
            counting_attempts(Arc::clone(&counter), Some(1)),
        )
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn kth_success_stops_further_attempts() {
        let policy = RetryPolicy::new().with_max_retries(3);
        let cancel = CancellationToken::new();
        let counter = Arc::new(AtomicU32::new(0));

        let result = run(
            &policy,
            &cancel,
            counting_attempts(Arc::clone(&counter), Some(3)),
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_makes_no_attempts() {
        let policy = RetryPolicy::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let counter = Arc::new(AtomicU32::new(0));

        let result = run(&policy, &cancel, counting_attempts(Arc::clone(&counter), None)).await;

        assert!(result.unwrap_err().is_abort());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_mid_delay_stops_retrying() {
        let policy = RetryPolicy::new().with_max_retries(5);
        let cancel = CancellationToken::new();
        let counter = Arc::new(AtomicU32::new(0));

        let result = {
            let counter = Arc::clone(&counter);
            let cancel_inner = cancel.clone();
            run(&policy, &cancel, move || {
                let counter = Arc::clone(&counter);
                let cancel_inner = cancel_inner.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    // Cancel after the first failure; the delay before the
                    // second attempt must observe it.
                    cancel_inner.cancel();
                    Err::<u32, _>(Error::api(500, "boom"))
                }
            })
            .await
        };

        assert!(result.unwrap_err().is_abort());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
