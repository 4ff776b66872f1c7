//! # Error Handling
//!
//! Custom error types and their conversion to HTTP responses.
//!
//! ## Error taxonomy:
//! The transcription pipeline has three failure points, each with its own
//! variant so the HTTP layer can map them cleanly:
//! - **ModelLoad**: the requested Whisper model could not be fetched or
//!   initialized. Fatal for the attempt; the client may try again.
//! - **Decode**: the uploaded audio buffer is unsupported or corrupt. The
//!   current transcription attempt is aborted; the user must re-record.
//! - **Inference**: the model rejected the input or failed internally.
//!   No retry, no partial result.
//!
//! The remaining variants cover the usual HTTP surface (bad input, unknown
//! routes, configuration problems).

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Application error type returned by all request handlers.
#[derive(Debug)]
pub enum AppError {
    /// Internal server errors not covered by a more specific variant
    Internal(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// Requested resource was not found
    NotFound(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// User input failed validation rules
    ValidationError(String),

    /// Whisper model download or initialization failed
    ModelLoad(String),

    /// Recorded audio buffer could not be decoded
    Decode(String),

    /// Model inference rejected the input or failed internally
    Inference(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ModelLoad(msg) => write!(f, "Model load error: {}", msg),
            AppError::Decode(msg) => write!(f, "Audio decode error: {}", msg),
            AppError::Inference(msg) => write!(f, "Inference error: {}", msg),
        }
    }
}

/// Converts application errors into JSON HTTP responses.
///
/// ## HTTP Status Code Mapping:
/// - Internal/ConfigError/ModelLoad/Inference → 500 (Internal Server Error)
/// - BadRequest/ValidationError/Decode → 400 (Bad Request)
/// - NotFound → 404 (Not Found)
///
/// ## JSON Response Format:
/// ```json
/// {
///   "error": {
///     "type": "decode_error",
///     "message": "unsupported container format",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status, error_type, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            AppError::ModelLoad(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "model_load_error", msg.clone()),
            AppError::Decode(msg) => (StatusCode::BAD_REQUEST, "decode_error", msg.clone()),
            AppError::Inference(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "inference_error", msg.clone()),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

/// anyhow errors from the loading/inference internals become internal errors
/// unless a handler maps them to a more specific variant first.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing errors are almost always malformed client data, so they map
/// to 400 rather than 500.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// WAV container errors surface at the format bridge and abort the attempt.
impl From<hound::Error> for AppError {
    fn from(err: hound::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            AppError::Decode("bad wav".into()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ModelLoad("offline".into()).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Inference("rejected".into()).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::NotFound("nope".into()).error_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_display() {
        let err = AppError::Decode("truncated header".into());
        assert_eq!(err.to_string(), "Audio decode error: truncated header");
    }
}
