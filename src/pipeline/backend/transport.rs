//! Plain HTTPS plumbing shared by the provider clients.
//!
//! Clients talk to an [`HttpTransport`] instead of `reqwest` directly so the
//! retry and fallback policy can run against scripted responses.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::pipeline::structuring::StructuringError;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of extra attempts after a transient failure.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default backoff base; the n-th retry waits `base × n`.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 400;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, StructuringError> {
        serde_json::from_str(&self.body).map_err(|e| StructuringError::ResponseParsing(e.to_string()))
    }

    /// First 300 characters of the body, for error messages.
    pub fn snippet(&self) -> String {
        self.body.chars().take(300).collect()
    }
}

/// Blocking HTTP seam. Transport failures (connect, timeout, unreadable body)
/// are `StructuringError::HttpClient`; any received status is `Ok`.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, StructuringError>;

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<HttpResponse, StructuringError>;
}

/// `reqwest::blocking` transport with a fixed per-call timeout.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, StructuringError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StructuringError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    fn finish(
        &self,
        sent: Result<reqwest::blocking::Response, reqwest::Error>,
    ) -> Result<HttpResponse, StructuringError> {
        let response = sent.map_err(|e| self.map_error(e))?;
        let status = response.status();
        let body = response.text().map_err(|e| self.map_error(e))?;
        Ok(HttpResponse { status, body })
    }

    fn map_error(&self, e: reqwest::Error) -> StructuringError {
        if e.is_timeout() {
            StructuringError::HttpClient(format!(
                "Request timed out after {}s",
                self.timeout.as_secs()
            ))
        } else if e.is_connect() {
            StructuringError::HttpClient(format!("Connection failed: {e}"))
        } else {
            StructuringError::HttpClient(e.to_string())
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, StructuringError> {
        let mut builder = self.client.get(url);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.finish(builder.send())
    }

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<HttpResponse, StructuringError> {
        let mut builder = self.client.post(url).json(body);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.finish(builder.send())
    }
}

// ──────────────────────────────────────────────
// Retry policy
// ──────────────────────────────────────────────

/// Bounded retry with linear backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
        }
    }
}

impl RetryPolicy {
    /// Same retry count, no sleeping.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_base: Duration::ZERO,
        }
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }

    /// Run `send` until it yields a non-transient outcome or retries run out.
    ///
    /// A retryable status left over after the last attempt is returned as a
    /// response, not an error; the caller classifies it.
    pub fn run<F>(&self, provider: &str, mut send: F) -> Result<HttpResponse, StructuringError>
    where
        F: FnMut() -> Result<HttpResponse, StructuringError>,
    {
        let mut attempt = 0;
        loop {
            let outcome = send();
            let transient = match &outcome {
                Err(StructuringError::HttpClient(msg)) => Some(msg.clone()),
                Ok(resp) if is_retryable_status(resp.status) => {
                    Some(format!("status {}", resp.status.as_u16()))
                }
                _ => None,
            };

            match transient {
                Some(reason) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        provider,
                        attempt,
                        reason = %reason,
                        delay_ms = delay.as_millis() as u64,
                        "Transient HTTP failure, retrying"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                _ => return outcome,
            }
        }
    }
}

/// Rate limiting and gateway-class failures.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}
