//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured
//! error variants, mapping the engine's taxonomy onto HTTP statuses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use doorstep_core::DoorstepError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Doorstep engine error - resolution, gateway, or storage failure
    #[error("Doorstep error: {0}")]
    Doorstep(#[from] DoorstepError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Doorstep(ref e) => match e {
                // No geocode match → 404
                DoorstepError::NotFound(_) => StatusCode::NOT_FOUND,

                // Courtesy bucket refused → 429, try again shortly
                DoorstepError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,

                // Client-provided invalid input → 400
                DoorstepError::InvalidInput(_) => StatusCode::BAD_REQUEST,

                // External service failures → 503
                DoorstepError::Upstream { .. } | DoorstepError::HttpError(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }

                // Feedback log failures → 500
                DoorstepError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Doorstep(ref e) => match e {
                DoorstepError::NotFound(_) => "NOT_FOUND",
                DoorstepError::RateLimited(_) => "RATE_LIMITED",
                DoorstepError::InvalidInput(_) => "INVALID_INPUT",
                DoorstepError::Upstream { .. } | DoorstepError::HttpError(_) => "UPSTREAM_ERROR",
                DoorstepError::Storage(_) => "STORAGE_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // For engine errors, sanitize internal details
            Self::Doorstep(ref e) => match e {
                DoorstepError::NotFound(query) => {
                    format!("No match found for \"{query}\"")
                }
                DoorstepError::RateLimited(_) => {
                    "Too many lookups right now, try again shortly".to_string()
                }
                DoorstepError::InvalidInput(reason) => format!("Invalid input: {reason}"),
                DoorstepError::Upstream { service, .. } => {
                    format!("Upstream {service} service error")
                }
                DoorstepError::HttpError(_) => "Upstream service error".to_string(),
                DoorstepError::Storage(_) => "Feedback storage error".to_string(),
            },
            // For other errors, use the Display message
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
            Self::Doorstep(_) => "doorstep",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic
        // error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
