//! API error handling for the Stowage HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::QuotaShortfall;
use crate::quota::format_megabytes;
use crate::StowageError;

/// Message for quota rejections of flat uploads.
pub const STORAGE_LIMIT_EXCEEDED: &str = "Storage limit exceeded";

/// Message for quota rejections of folder-tree uploads.
pub const INSUFFICIENT_STORAGE: &str = "Insufficient storage for new files";

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Field-level validation failure (400).
    ValidationError,
    /// Upload would exceed the storage ceiling (400).
    QuotaExceeded,
    /// Not found (404).
    NotFound,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::ValidationError | ErrorCode::QuotaExceeded => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub message: String,
    /// Error code.
    pub code: ErrorCode,
    /// Structured details (field errors or quota breakdown).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<Value>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a quota error carrying the space breakdown.
    pub fn quota_exceeded(message: impl Into<String>, shortfall: &QuotaShortfall) -> Self {
        Self::new(ErrorCode::QuotaExceeded, message).with_details(json!({
            "currentUsed": format!("{} MB", format_megabytes(shortfall.current_used)),
            "availableSpace": format!("{} MB", format_megabytes(shortfall.available)),
            "requiredSpace": format!("{} MB", format_megabytes(shortfall.required)),
            "currentUsedBytes": shortfall.current_used,
            "availableSpaceBytes": shortfall.available,
            "requiredSpaceBytes": shortfall.required,
            "skippedFiles": shortfall.skipped,
        }))
    }

    /// Create a validation error from validator::ValidationErrors.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut details = serde_json::Map::new();

        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            details.insert(field.to_string(), json!(messages));
        }

        let message = details
            .values()
            .filter_map(|v| v.get(0).and_then(Value::as_str))
            .next()
            .unwrap_or("Validation failed")
            .to_string();

        Self::new(ErrorCode::ValidationError, message).with_details(Value::Object(details))
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Message returned to the client.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            message: self.message,
            code: self.code,
            details: self.details,
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StowageError> for ApiError {
    fn from(err: StowageError) -> Self {
        match &err {
            StowageError::Validation(msg) => ApiError::bad_request(msg.clone()),
            StowageError::QuotaExceeded(shortfall) => {
                ApiError::quota_exceeded(STORAGE_LIMIT_EXCEEDED, shortfall)
            }
            StowageError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}
