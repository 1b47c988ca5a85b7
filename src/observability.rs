use biometrics::{Collector, Counter, Moments};

pub(crate) static HEALTH_CHECKS: Counter = Counter::new("palaver.monitor.checks");
pub(crate) static HEALTH_CHECK_FAILURES: Counter = Counter::new("palaver.monitor.check_failures");

pub(crate) static CHAT_REQUESTS: Counter = Counter::new("palaver.client.requests");
pub(crate) static CHAT_REQUEST_ERRORS: Counter = Counter::new("palaver.client.request_errors");
pub(crate) static CHAT_REQUEST_RETRIES: Counter = Counter::new("palaver.client.retries");
pub(crate) static CHAT_REQUEST_DURATION: Moments =
    Moments::new("palaver.client.request_duration_seconds");

pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("palaver.stream.fragments");
pub(crate) static STREAM_FRAMES_SKIPPED: Counter = Counter::new("palaver.stream.frames_skipped");
pub(crate) static STREAM_BYTES: Counter = Counter::new("palaver.stream.bytes");
pub(crate) static STREAM_DURATION: Moments = Moments::new("palaver.stream.duration_seconds");

pub(crate) static SUBMITS: Counter = Counter::new("palaver.session.submits");
pub(crate) static SUBMITS_REJECTED: Counter = Counter::new("palaver.session.submits_rejected");
pub(crate) static SUBMITS_FAILED: Counter = Counter::new("palaver.session.submits_failed");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&HEALTH_CHECKS);
    collector.register_counter(&HEALTH_CHECK_FAILURES);

    collector.register_counter(&CHAT_REQUESTS);
    collector.register_counter(&CHAT_REQUEST_ERRORS);
    collector.register_counter(&CHAT_REQUEST_RETRIES);
    collector.register_moments(&CHAT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_FRAMES_SKIPPED);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SUBMITS);
    collector.register_counter(&SUBMITS_REJECTED);
    collector.register_counter(&SUBMITS_FAILED);
}
