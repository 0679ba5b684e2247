use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use super::pages;
use crate::services::{AdminError, AuthError, SigError};

/// Error returned by JSON endpoints.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(format!("{err:#}"))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(fields) => ApiError::ValidationError(fields.to_string()),
            AuthError::DuplicateCredential => ApiError::Conflict(err.to_string()),
            AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::Database(msg) => ApiError::DatabaseError(msg),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<SigError> for ApiError {
    fn from(err: SigError) -> Self {
        match err {
            SigError::Validation(msg) => ApiError::ValidationError(msg),
            SigError::NotFound => ApiError::NotFound("File not found".to_string()),
            SigError::Database(msg) => ApiError::DatabaseError(msg),
            SigError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Validation(fields) => ApiError::ValidationError(fields.to_string()),
            AdminError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            AdminError::Conflict(msg) => ApiError::Conflict(msg),
            AdminError::Forbidden(msg) => ApiError::Forbidden(msg),
            AdminError::Database(msg) => ApiError::DatabaseError(msg),
            AdminError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Authentication required".to_string())
    }
}

/// Error returned by HTML pages; same taxonomy, rendered as a page.
#[derive(Debug)]
pub enum PageError {
    NotFound,

    Forbidden,

    BadRequest(String),

    Internal(String),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PageError::NotFound => (StatusCode::NOT_FOUND, "The page you asked for does not exist.".to_string()),
            PageError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to access this page.".to_string(),
            ),
            PageError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            PageError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred.".to_string(),
                )
            }
        };

        (status, pages::error_page(status, &message)).into_response()
    }
}

impl From<anyhow::Error> for PageError {
    fn from(err: anyhow::Error) -> Self {
        PageError::Internal(format!("{err:#}"))
    }
}

impl From<tower_sessions::session::Error> for PageError {
    fn from(err: tower_sessions::session::Error) -> Self {
        PageError::Internal(format!("Session error: {err}"))
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ApiError::InternalError(format!("Session error: {err}"))
    }
}

impl From<AuthError> for PageError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(fields) => PageError::BadRequest(fields.to_string()),
            AuthError::DuplicateCredential | AuthError::InvalidCredentials => {
                PageError::BadRequest(err.to_string())
            }
            AuthError::Database(msg) | AuthError::Internal(msg) => PageError::Internal(msg),
        }
    }
}

impl From<SigError> for PageError {
    fn from(err: SigError) -> Self {
        match err {
            SigError::Validation(msg) => PageError::BadRequest(msg),
            SigError::NotFound => PageError::NotFound,
            SigError::Database(msg) | SigError::Internal(msg) => PageError::Internal(msg),
        }
    }
}

impl From<AdminError> for PageError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Validation(fields) => PageError::BadRequest(fields.to_string()),
            AdminError::Conflict(msg) => PageError::BadRequest(msg),
            AdminError::NotFound(_) => PageError::NotFound,
            AdminError::Forbidden(_) => PageError::Forbidden,
            AdminError::Database(msg) | AdminError::Internal(msg) => PageError::Internal(msg),
        }
    }
}
