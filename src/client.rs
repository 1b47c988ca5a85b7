use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::observability::{CHAT_REQUEST_DURATION, CHAT_REQUEST_ERRORS, CHAT_REQUESTS};
use crate::retry::{self, RetryPolicy};
use crate::sse;
use crate::types::{ChatRequest, StreamFragment};

const HEALTH_PATH: &str = "/health";
const CHAT_PATH: &str = "/api/chat";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the chat backend.
///
/// Wraps a reqwest client with a validated base URL, a retry policy for the
/// chat endpoint, and a shared [`Connectivity`] handle that the request path
/// updates on success and exhaustion.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
    connectivity: Connectivity,
}

impl ChatClient {
    /// Create a new client for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        // Parse eagerly so a bad base URL fails at construction, not on the
        // first request.
        url::Url::parse(&base_url)?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let timeout = DEFAULT_TIMEOUT;
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(format!("Failed to build HTTP client: {e}"), Some(Box::new(e)))
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
            retry_policy: RetryPolicy::new(),
            connectivity: Connectivity::new(),
        })
    }

    /// Sets the per-request timeout, rebuilding the underlying HTTP client.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.timeout = timeout;
        self.client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(format!("Failed to build HTTP client: {e}"), Some(Box::new(e)))
            })?;
        Ok(self)
    }

    /// Sets the retry policy for chat requests.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Replaces the connectivity handle, sharing state with the caller's.
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// The connectivity handle this client reports into.
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// The retry policy for chat requests.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create and return default headers for backend requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Turn a non-success response into an error, pulling the backend's
    /// `detail` field out of the body when present.
    async fn status_error(response: Response) -> Error {
        let status_code = response.status().as_u16();

        #[derive(Deserialize)]
        struct ErrorResponse {
            detail: Option<String>,
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.detail)
            .unwrap_or_else(|| format!("HTTP error! status: {status_code}"));
        Error::api(status_code, message)
    }

    /// Issue one health check with a hard deadline.
    ///
    /// Exactly one attempt: no retries here, the monitor's interval provides
    /// the cadence. The connectivity handle is not touched; the caller owns
    /// that transition.
    pub async fn health(&self, check_timeout: Duration) -> Result<()> {
        let url = self.endpoint(HEALTH_PATH);
        let request = self
            .client
            .get(&url)
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .send();

        let response = match tokio::time::timeout(check_timeout, request).await {
            Ok(result) => result.map_err(|e| self.map_request_error(e))?,
            Err(_) => {
                return Err(Error::timeout(
                    "health check timed out",
                    Some(check_timeout.as_secs_f64()),
                ));
            }
        };

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        Ok(())
    }

    /// POST the conversation to the chat endpoint and stream the reply.
    ///
    /// The request is retried under the client's [`RetryPolicy`]; any success
    /// marks the shared connectivity connected, exhaustion marks it
    /// disconnected and returns [`Error::ExhaustedRetries`]. The returned
    /// stream yields the reply's text fragments in arrival order.
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamFragment>> + Send>>> {
        let start = Instant::now();
        let outcome = retry::run(&self.retry_policy, cancel, || self.try_chat_once(request)).await;
        CHAT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let response = match outcome {
            Ok(response) => {
                self.connectivity.mark_connected();
                response
            }
            Err(err) => {
                if !err.is_abort() {
                    self.connectivity.mark_disconnected(err.to_string());
                }
                return Err(err);
            }
        };

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.starts_with("text/event-stream") {
            return Err(Error::stream_unavailable(format!(
                "expected an event stream, got content type '{content_type}'"
            )));
        }

        let this = self.clone();
        let byte_stream = response
            .bytes_stream()
            .map(move |result| result.map_err(|e| this.map_request_error(e)));
        Ok(Box::pin(sse::fragments(Box::pin(byte_stream))))
    }

    /// One chat POST attempt: dispatch errors and non-success statuses both
    /// come back as `Err` so the retry loop treats them uniformly.
    async fn try_chat_once(&self, request: &ChatRequest) -> Result<Response> {
        CHAT_REQUESTS.click();
        let url = self.endpoint(CHAT_PATH);
        let mut headers = self.default_headers();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let result = self
            .client
            .post(&url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e));

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                CHAT_REQUEST_ERRORS.click();
                return Err(err);
            }
        };

        if !response.status().is_success() {
            CHAT_REQUEST_ERRORS.click();
            return Err(Self::status_error(response).await);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = ChatClient::new("http://localhost:8000").unwrap();
        assert_eq!(client.base_url, "http://localhost:8000");
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        assert_eq!(client.retry_policy, RetryPolicy::new());

        let client = ChatClient::new("http://localhost:8000/")
            .unwrap()
            .with_timeout(Duration::from_secs(30))
            .unwrap()
            .with_retry_policy(RetryPolicy::new().with_max_retries(1));
        assert_eq!(client.base_url, "http://localhost:8000");
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert_eq!(client.retry_policy.max_retries, 1);
    }

    #[test]
    fn invalid_base_url_rejected() {
        assert!(ChatClient::new("not a url").is_err());
    }

    #[test]
    fn endpoints_join_without_double_slash() {
        let client = ChatClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.endpoint(HEALTH_PATH), "http://localhost:8000/health");
        assert_eq!(client.endpoint(CHAT_PATH), "http://localhost:8000/api/chat");
    }

    #[test]
    fn injected_connectivity_is_shared() {
        let connectivity = Connectivity::new();
        let client = ChatClient::new("http://localhost:8000")
            .unwrap()
            .with_connectivity(connectivity.clone());
        client.connectivity().mark_connected();
        assert!(connectivity.is_connected());
    }
}
