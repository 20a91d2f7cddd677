use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::error::{ErrorKind, WriteFailure};
use serde::Serialize;
use tracing::{error, warn};

const DUPLICATE_KEY: i32 = 11000;

/// Tagged failure returned by every handler. `IntoResponse` is the one place
/// where errors become HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidPassword(String),

    #[error("{0}")]
    EmailAlreadyTaken(String),

    #[error("{0}")]
    UnprocessableEntity(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: &'static str,
    pub description: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidPassword(_) => StatusCode::FORBIDDEN,
            ApiError::EmailAlreadyTaken(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPassword(_) => "INVALID_PASSWORD_ERROR",
            ApiError::EmailAlreadyTaken(_) => "EMAIL_ALREADY_TAKEN_ERROR",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND_ERROR",
            ApiError::InvalidCredentials(_) => "INVALID_CREDENTIALS_ERROR",
            ApiError::Unauthorized(_) => "NO_ANONYMOUS_ACCESS_ERROR",
            ApiError::Internal(_) => "SERVER_ERROR",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ApiError::InvalidPassword(_) => "Invalid password",
            ApiError::EmailAlreadyTaken(_) => "Email is already registered",
            ApiError::UnprocessableEntity(_) => "Unprocessable entity",
            ApiError::NotFound(_) => "Route or resource not found",
            ApiError::InvalidCredentials(_) => "Invalid credentials",
            ApiError::Unauthorized(_) => "Access denied, no anonymous access",
            ApiError::Internal(_) => "Server error",
        }
    }

    /// Message shown to the client. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Something went wrong".to_string(),
            other => other.to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status_code: self.status().as_u16(),
            error: self.code(),
            description: self.description(),
            message: self.public_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(code = self.code(), message = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            return ApiError::EmailAlreadyTaken("This email already taken".into());
        }
        ApiError::Internal(format!("database: {err}"))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{err:#}"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::UnprocessableEntity(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::UnprocessableEntity("Invalid user id".into())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::UnprocessableEntity(rejection.body_text())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}
