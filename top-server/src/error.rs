use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use top_core::ProviderError;

/// OAuth 2.0 style error body.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: &'static str,
    pub error_description: String,
}

/// Errors returned by the HTTP endpoints.
#[derive(Debug)]
pub enum ApiError {
    /// The submitted data failed validation (login).
    Unprocessable(String),
    /// Missing or malformed request parameters.
    InvalidRequest(String),
    /// The authorization code is invalid, expired or already used.
    InvalidGrant(String),
    /// Missing, unknown or expired bearer token.
    Forbidden(String),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unprocessable(_) => "invalid_request",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::InvalidGrant(_) => "invalid_grant",
            ApiError::Forbidden(_) => "access_denied",
            ApiError::Internal(_) => "server_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidGrant(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn description(&self) -> &str {
        match self {
            ApiError::Unprocessable(s)
            | ApiError::InvalidRequest(s)
            | ApiError::InvalidGrant(s)
            | ApiError::Forbidden(s)
            | ApiError::Internal(s) => s,
        }
    }
}

/// Default mapping; the login endpoint maps `InvalidInput` to 422 itself.
impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidInput(msg) => ApiError::InvalidRequest(msg),
            ProviderError::InvalidState(msg) => ApiError::InvalidGrant(msg),
            // Do not reveal whether the token expired or never existed.
            ProviderError::NotFound(_) => {
                ApiError::Forbidden("Not authorized to get user info.".into())
            }
            ProviderError::Config(msg) | ProviderError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(msg) = &self {
            tracing::error!(error = %msg, "Request failed");
        }
        let body = ApiErrorBody {
            error: self.error_code(),
            error_description: self.description().to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.description())
    }
}

impl std::error::Error for ApiError {}
