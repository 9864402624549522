//! Retrying JSON HTTP client
//!
//! Retry decisions follow the Google Analytics error docs:
//! <https://developers.google.com/analytics/devguides/reporting/core/v4/errors>
//! <https://developers.google.com/analytics/devguides/config/mgmt/v3/errors>

use crate::auth::Authenticator;
use crate::error::{Error, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 403 error reasons that indicate a quota limit rather than a permission
/// denial
const RETRYABLE_403_REASONS: [&str; 3] =
    ["userRateLimitExceeded", "rateLimitExceeded", "quotaExceeded"];

/// Retry/backoff configuration
///
/// The defaults mirror the upstream quota guidance: few tries with long
/// waits (10s, 100s, 1000s between four attempts).
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_tries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Multiplier applied per retry
    pub multiplier: u32,
    /// Upper bound on any single wait
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_tries: 4,
            initial_backoff: Duration::from_secs(10),
            multiplier: 10,
            max_backoff: Duration::from_secs(1000),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (zero-based)
    fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry);
        std::cmp::min(self.initial_backoff.saturating_mul(factor), self.max_backoff)
    }
}

/// HTTP client for the Google Analytics APIs
pub struct HttpClient {
    client: reqwest::Client,
    authenticator: Option<Arc<Authenticator>>,
    retry: RetryConfig,
    quota_user: Option<String>,
}

impl HttpClient {
    /// Create a client without authentication (tests)
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            authenticator: None,
            retry: RetryConfig::default(),
            quota_user: None,
        }
    }

    /// Attach an authenticator; every request carries its bearer token
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Override the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Attach a `quotaUser` parameter to every request
    #[must_use]
    pub fn with_quota_user(mut self, quota_user: Option<String>) -> Self {
        self.quota_user = quota_user;
        self
    }

    /// GET a JSON document
    pub async fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<Value> {
        self.request(Method::GET, url, params, None).await
    }

    /// POST a JSON body, returning the JSON response
    pub async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, url, &[], Some(body)).await
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(method.clone(), url, params, body).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < self.retry.max_tries => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "Retryable error on attempt {}/{} for {url}, backing off {delay:?}: {e}",
                        attempt + 1,
                        self.retry.max_tries,
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut req = self.client.request(method.clone(), url);

        if let Some(auth) = &self.authenticator {
            let token = auth.access_token().await?;
            req = req.bearer_auth(token);
        }
        if let Some(quota_user) = &self.quota_user {
            req = req.query(&[("quotaUser", quota_user.as_str())]);
        }
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let json: Option<Value> = serde_json::from_str(&text).ok();

        if status.is_success() {
            debug!("Request succeeded: {method} {url}");
            return json.ok_or_else(|| {
                Error::report_shape(format!("expected a JSON body from {url}"))
            });
        }

        Err(classify_failure(status, json.as_ref(), &text))
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("retry", &self.retry)
            .field("has_authenticator", &self.authenticator.is_some())
            .finish_non_exhaustive()
    }
}

/// Map a failed response to an error, deciding retryability from the body
fn classify_failure(status: StatusCode, json: Option<&Value>, raw: &str) -> Error {
    // Most retryable errors require a JSON body; a non-JSON response is
    // assumed transient
    let Some(json) = json else {
        return Error::http_status(503, format!("non-JSON response: {}", truncate(raw)));
    };

    let message = error_message(json).unwrap_or_else(|| truncate(raw));

    match status.as_u16() {
        429 => Error::QuotaExceeded {
            reason: message,
        },
        403 => {
            let reasons = error_reasons(json);
            if reasons
                .iter()
                .any(|r| RETRYABLE_403_REASONS.contains(&r.as_str()))
            {
                Error::QuotaExceeded { reason: message }
            } else {
                Error::http_status(403, message)
            }
        }
        code => Error::http_status(code, message),
    }
}

/// Pull the human-readable error message out of a Google error body
fn error_message(json: &Value) -> Option<String> {
    match json.get("error")? {
        Value::Object(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        // Some endpoints put a bare string in "error" (e.g. 401s)
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Collect error reasons defensively.
///
/// The Google APIs don't report error reasons uniformly across endpoints
/// and versions, so every observed shape is checked.
fn error_reasons(json: &Value) -> HashSet<String> {
    let mut reasons = HashSet::new();
    let Some(error) = json.get("error") else {
        return reasons;
    };

    if let Some(errors) = error.get("errors").and_then(Value::as_array) {
        for sub_error in errors {
            if let Some(reason) = sub_error.get("reason").and_then(Value::as_str) {
                reasons.insert(reason.to_string());
            } else if let Some(desc) = sub_error.get("error_description").and_then(Value::as_str) {
                reasons.insert(desc.to_string());
            }
        }
    } else if let Some(reason) = json.get("reason").and_then(Value::as_str) {
        reasons.insert(reason.to_string());
    } else if let Some(desc) = json.get("error_description").and_then(Value::as_str) {
        reasons.insert(desc.to_string());
    } else if let Some(s) = error.as_str() {
        reasons.insert(s.to_string());
    }

    reasons
}

fn truncate(raw: &str) -> String {
    const MAX: usize = 500;
    if raw.len() <= MAX {
        return raw.to_string();
    }
    // Cutting at MAX directly can split a multi-byte character
    let mut end = MAX;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &raw[..end])
}
