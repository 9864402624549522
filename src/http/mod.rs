//! HTTP transport with Google-specific retry classification
//!
//! All Google Analytics endpoints speak JSON, so the client exposes
//! JSON-in/JSON-out requests and owns the retry policy:
//! - HTTP 429 and 5xx are retried with exponential backoff
//! - HTTP 403 is retried only when the error reasons indicate a quota limit
//! - non-JSON error bodies are assumed transient and retried
//!
//! Other 4xx errors surface immediately as permanent, carrying the
//! upstream error message.

mod client;

pub use client::{HttpClient, RetryConfig};
