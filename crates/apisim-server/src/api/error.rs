//! API error types and response handling.
//!
//! Every failure is reported the way the Slack Web API reports it: an HTTP
//! status plus a body of the form `{"ok": false, "error": "<code>"}`, with an
//! optional human-readable `message`.

use apisim_core::SimError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Missing or invalid arguments.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: Option<String>,
    },

    /// 401 Unauthorized - Missing or rejected bearer token.
    Unauthorized {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 404 Not Found - Route or record does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: Option<String>,
    },

    /// 405 Method Not Allowed - Route exists but not for this method.
    MethodNotAllowed,

    /// 415 Unsupported Media Type - Body is not in an accepted format.
    UnsupportedMediaType {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "ok": false,
    "error": "channel_not_found",
    "message": "Channel parameter required"
}))]
pub struct ErrorResponse {
    /// Always `false`.
    #[schema(example = false)]
    pub ok: bool,

    /// Machine-readable error code (e.g., "channel_not_found").
    #[schema(example = "channel_not_found")]
    pub error: String,

    /// Optional human-readable error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(nullable)]
    pub message: Option<String>,
}

impl ApiError {
    /// 400 with a code and message.
    pub fn bad_request(error_code: &str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            error_code: error_code.to_string(),
            message: Some(message.into()),
        }
    }

    /// 400 `missing_parameter`.
    pub fn missing_parameter(message: impl Into<String>) -> Self {
        Self::bad_request("missing_parameter", message)
    }

    /// 400 `invalid_request`.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::bad_request("invalid_request", message)
    }

    /// 401 with a code and message.
    pub fn unauthorized(error_code: &str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            error_code: error_code.to_string(),
            message: message.into(),
        }
    }

    /// 404 `not_found` for unknown routes.
    #[must_use]
    pub fn route_not_found() -> Self {
        Self::NotFound {
            error_code: "not_found".to_string(),
            message: Some("Endpoint not found".to_string()),
        }
    }

    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &str {
        match self {
            Self::BadRequest { error_code, .. }
            | Self::Unauthorized { error_code, .. }
            | Self::NotFound { error_code, .. }
            | Self::UnsupportedMediaType { error_code, .. }
            | Self::InternalError { error_code, .. } => error_code,
            Self::MethodNotAllowed => "method_not_allowed",
        }
    }

    fn into_body(self) -> ErrorResponse {
        let error = self.error_code().to_string();
        let message = match self {
            // Slack omits `message` for plain lookups, so these stay optional
            Self::BadRequest { message, .. } | Self::NotFound { message, .. } => message,
            Self::Unauthorized { message, .. }
            | Self::UnsupportedMediaType { message, .. }
            | Self::InternalError { message, .. } => Some(message),
            Self::MethodNotAllowed => {
                Some("HTTP method not allowed for this endpoint".to_string())
            }
        };
        ErrorResponse {
            ok: false,
            error,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Client errors are routine; only server-side failures are logged here
        if let Self::InternalError {
            error_code,
            message,
        } = &self
        {
            tracing::error!(
                error_code = %error_code,
                message = %message,
                "Internal server error"
            );
        }

        (status, Json(self.into_body())).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { error_code, message } => {
                write!(f, "Bad Request: {}", message.as_deref().unwrap_or(error_code))
            }
            Self::Unauthorized { message, .. } => write!(f, "Unauthorized: {message}"),
            Self::NotFound { error_code, message } => {
                write!(f, "Not Found: {}", message.as_deref().unwrap_or(error_code))
            }
            Self::MethodNotAllowed => f.write_str("Method Not Allowed"),
            Self::UnsupportedMediaType { message, .. } => {
                write!(f, "Unsupported Media Type: {message}")
            }
            Self::InternalError { message, .. } => write!(f, "Internal Error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from apisim_core errors.
impl From<SimError> for ApiError {
    fn from(err: SimError) -> Self {
        let error_code = err.error_code().to_string();
        // The core decides the status; anything it does not map to 400/404 is a 500
        match err.http_status_code() {
            400 => Self::BadRequest {
                error_code,
                message: Some(err.to_string()),
            },
            404 => Self::NotFound {
                error_code,
                message: Some(err.to_string()),
            },
            _ => Self::InternalError {
                error_code,
                message: err.to_string(),
            },
        }
    }
}
