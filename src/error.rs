//! Error types for the tap
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the tap
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    #[error("JWT assertion failed: {message}")]
    JwtGeneration { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} Client Error: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Rate limited by quota: {reason}")]
    QuotaExceeded { reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Discovery Errors
    // ============================================================================
    #[error("Unknown Google Analytics type: {field_type}")]
    UnknownFieldType { field_type: String },

    #[error("Unknown custom field kind: {kind}")]
    UnknownCustomFieldKind { kind: String },

    #[error("Discovery failed: {message}")]
    Discovery { message: String },

    // ============================================================================
    // Catalog / Sync Errors
    // ============================================================================
    #[error("Invalid catalog: {message}")]
    Catalog { message: String },

    #[error("State error: {message}")]
    State { message: String },

    #[error("Malformed report response: {message}")]
    ReportShape { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            message: message.into(),
        }
    }

    /// Create a discovery error
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Create a catalog error
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a report-shape error
    pub fn report_shape(message: impl Into<String>) -> Self {
        Self::ReportShape {
            message: message.into(),
        }
    }

    /// Check if this error is retryable at the transport boundary
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::QuotaExceeded { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if this error is a permission denial (an HTTP 403 that did not
    /// classify as a quota error). Permission-scoped discovery gaps are
    /// soft failures: the caller skips the account and continues.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::HttpStatus { status: 403, .. })
    }
}

/// Check if an HTTP status code is retryable absent body-level classification
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for the tap
pub type Result<T> = std::result::Result<T, Error>;
