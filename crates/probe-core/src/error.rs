//! Error types for backend calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of probe errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    /// Could not reach the backend (refused, DNS, reset before response)
    Connection,
    /// Connection timeout or request timeout
    Timeout,
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Failed to parse a response body
    Parse,
    /// Invalid local input (unreadable image, bad URL)
    Input,
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeErrorKind::Connection => write!(f, "connection"),
            ProbeErrorKind::Timeout => write!(f, "timeout"),
            ProbeErrorKind::HttpStatus => write!(f, "http_status"),
            ProbeErrorKind::Parse => write!(f, "parse"),
            ProbeErrorKind::Input => write!(f, "input"),
        }
    }
}

/// Status code buckets that get their own operator-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    BadRequest,
    PayloadTooLarge,
    RateLimited,
    ServerError,
    ServiceUnavailable,
    Other,
}

impl StatusCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => StatusCategory::BadRequest,
            413 => StatusCategory::PayloadTooLarge,
            429 => StatusCategory::RateLimited,
            500 => StatusCategory::ServerError,
            503 => StatusCategory::ServiceUnavailable,
            _ => StatusCategory::Other,
        }
    }

    /// Builds the message shown to the operator for this category.
    pub fn user_message(self, status: u16, body: &str) -> String {
        match self {
            StatusCategory::BadRequest => {
                format!("Bad request, check the input format\nDetails: {body}")
            }
            StatusCategory::PayloadTooLarge => {
                "Image file is too large, upload a smaller image".to_string()
            }
            StatusCategory::RateLimited => "API rate limit reached, try again later".to_string(),
            StatusCategory::ServerError => {
                format!("Internal server error, possibly an API key problem\nDetails: {body}")
            }
            StatusCategory::ServiceUnavailable => "Server is busy, try again later".to_string(),
            StatusCategory::Other => format!("HTTP error {status}: {body}"),
        }
    }
}

/// Structured error from a backend call with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeError {
    /// Error category
    pub kind: ProbeErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
    /// HTTP status when the backend answered with an error
    pub status: Option<u16>,
}

impl ProbeError {
    pub fn new(kind: ProbeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            status: None,
        }
    }

    /// Creates an HTTP status error, classifying the status for display.
    pub fn http_status(status: u16, body: &str) -> Self {
        let message = StatusCategory::from_status(status).user_message(status, body);
        Self {
            kind: ProbeErrorKind::HttpStatus,
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
            status: Some(status),
        }
    }

    pub fn connection(base_url: &str, err: impl fmt::Display) -> Self {
        Self {
            kind: ProbeErrorKind::Connection,
            message: format!("Connection failed, make sure the backend is running at {base_url}"),
            details: Some(err.to_string()),
            status: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProbeErrorKind::Timeout, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProbeErrorKind::Parse, message)
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ProbeErrorKind::Input, message)
    }

    /// Returns the status category for HTTP errors.
    pub fn category(&self) -> Option<StatusCategory> {
        self.status.map(StatusCategory::from_status)
    }

    /// Message for the operation log: status plus raw body for HTTP errors.
    pub fn log_summary(&self) -> String {
        match (self.status, self.details.as_deref()) {
            (Some(status), Some(body)) => format!("{status} - {body}"),
            (Some(status), None) => status.to_string(),
            (None, Some(details)) => format!("{}: {details}", self.message),
            (None, None) => self.message.clone(),
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProbeError {}

/// Result type for backend operations.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Maps a reqwest failure into a probe error.
pub fn classify_reqwest_error(base_url: &str, e: &reqwest::Error) -> ProbeError {
    if e.is_timeout() {
        ProbeError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ProbeError::connection(base_url, e)
    } else if e.is_decode() {
        ProbeError::parse(format!("Failed to decode response: {e}"))
    } else {
        ProbeError::new(ProbeErrorKind::Connection, format!("Network error: {e}"))
    }
}

/// Extracts a readable message from the `error` field of a stream event.
///
/// Strings pass through verbatim; objects contribute their `message`.
pub fn error_field_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Null => "Unknown error".to_string(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string),
        other => other.to_string(),
    }
}
