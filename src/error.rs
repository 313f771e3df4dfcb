//! Structured error types for remote calls and store operations.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Generic detail used when a failure carries no usable description.
pub const GENERIC_DETAIL: &str = "An unexpected error occurred";

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Request never produced a response
    Transport,

    // Status-derived
    Unauthorized,
    NotFound,
    InvalidRequest,
    HttpStatus,

    // Success status with a body that is not the expected record
    Decode,
}

impl ErrorCode {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorCode::Unauthorized,
            StatusCode::NOT_FOUND => ErrorCode::NotFound,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorCode::InvalidRequest,
            _ => ErrorCode::HttpStatus,
        }
    }
}

/// Normalized failure of a call to the backend.
///
/// `message` is coarse ("API Error: 404"), `detail` is what a user should see.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub detail: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status_code: None,
            detail: detail.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    // Convenience constructors

    /// Build the error for a non-2xx response from its status and raw body.
    ///
    /// A body that parses as JSON contributes `detail`, then `message`, then
    /// the status text. A body that does not parse contributes the raw text,
    /// then the status text.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let status_text = status.canonical_reason().unwrap_or_default();
        let detail = match serde_json::from_str::<Value>(body) {
            Ok(json) => json_detail(&json)
                .or_else(|| non_empty(status_text))
                .unwrap_or_else(|| GENERIC_DETAIL.to_string()),
            Err(_) => non_empty(body.trim())
                .or_else(|| non_empty(status_text))
                .unwrap_or_else(|| GENERIC_DETAIL.to_string()),
        };
        Self::new(
            ErrorCode::from_status(status),
            format!("API Error: {}", status.as_u16()),
            detail,
        )
        .with_status(status.as_u16())
    }

    pub fn transport(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::Transport, "Network Error", err.to_string())
    }

    pub fn decode(status: Option<u16>, err: impl fmt::Display) -> Self {
        let err = Self::new(
            ErrorCode::Decode,
            "Invalid response body",
            format!("Unexpected response from server: {}", err),
        );
        match status {
            Some(status) => err.with_status(status),
            None => err,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    /// Token missing, rejected or expired.
    pub fn is_unauthorized(&self) -> bool {
        self.code == ErrorCode::Unauthorized
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Pull a human-readable description out of a JSON error body.
///
/// Validation failures report `detail` as a list of `{msg, ...}` objects.
fn json_detail(json: &Value) -> Option<String> {
    match json.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(Value::Array(items)) if !items.is_empty() => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if msgs.is_empty() {
                return Some(Value::Array(items.clone()).to_string());
            }
            return Some(msgs.join("; "));
        }
        Some(Value::Null) | None => {}
        Some(Value::String(_)) => {}
        Some(other) => return Some(other.to_string()),
    }
    json.get("message")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.detail)
    }
}

impl std::error::Error for ApiError {}

/// Failure of a task store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Task not found: {id}")]
    NotFound {
        id: String,
        #[source]
        source: Option<ApiError>,
    },
}

impl StoreError {
    pub fn not_found(id: &str) -> Self {
        StoreError::NotFound {
            id: id.to_string(),
            source: None,
        }
    }

    /// Attribute a backend 404 to the task id the call was about.
    pub fn for_task(id: &str, err: ApiError) -> Self {
        if err.is_not_found() {
            StoreError::NotFound {
                id: id.to_string(),
                source: Some(err),
            }
        } else {
            StoreError::Api(err)
        }
    }

    /// Message recorded in store state. API failures surface the server
    /// detail; anything else falls back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            StoreError::Api(err) => err.detail.clone(),
            StoreError::NotFound {
                source: Some(err), ..
            } => err.detail.clone(),
            StoreError::NotFound { source: None, .. } => {
                if fallback.is_empty() {
                    self.to_string()
                } else {
                    format!("{}: {}", fallback, self)
                }
            }
        }
    }

    pub fn api(&self) -> Option<&ApiError> {
        match self {
            StoreError::Api(err) => Some(err),
            StoreError::NotFound { source, .. } => source.as_ref(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
