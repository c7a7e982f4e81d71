use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lectern_auth::AuthError;
use lectern_learning::LearningError;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn locked(remaining_seconds: i64) -> Self {
        let minutes = (remaining_seconds + 59) / 60;
        Self::new(
            StatusCode::LOCKED,
            format!("Account is locked. Try again in {minutes} minutes."),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        error!(error = ?error, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}

impl From<LearningError> for ApiError {
    fn from(error: LearningError) -> Self {
        let status = match &error {
            LearningError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LearningError::InvalidStateTransition { .. } | LearningError::EmailAlreadyExists => {
                StatusCode::CONFLICT
            }
            LearningError::AccountLocked { remaining_seconds } => {
                return Self::locked(*remaining_seconds);
            }
            LearningError::NotEntitled => StatusCode::PAYMENT_REQUIRED,
            LearningError::ModuleLocked { .. } => StatusCode::FORBIDDEN,
            LearningError::NotFound(_) => StatusCode::NOT_FOUND,
            LearningError::Storage(_) => {
                error!(error = ?error, "storage error");
                return Self::internal_server_error("Internal storage error");
            }
        };
        Self::new(status, error.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Learning(inner) => inner.into(),
            AuthError::AccountLocked { remaining_seconds } => {
                warn!(remaining_seconds, "login refused during lockout");
                Self::locked(remaining_seconds)
            }
            AuthError::PasswordHash(_) => {
                error!(error = ?error, "password hashing error");
                Self::internal_server_error("Internal authentication error")
            }
            AuthError::AccountDisabled => Self::new(StatusCode::FORBIDDEN, error.to_string()),
            AuthError::InvalidCredentials
            | AuthError::SessionNotFound
            | AuthError::SessionExpired
            | AuthError::InvalidSession => Self::unauthorized(error.to_string()),
        }
    }
}
