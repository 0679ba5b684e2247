//! Domain service for authentication.
//!
//! Handles registration, credential checks, logout auditing and resolving a
//! session's user id into a [`CurrentUser`].

use thiserror::Error;

use crate::db::User;
use crate::domain::{CurrentUser, FieldErrors, UserId};
use crate::services::RequestMeta;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Email already registered")]
    DuplicateCredential,

    #[error("Invalid credentials or inactive account")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an active user and records a `register` audit row.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for bad input and
    /// [`AuthError::DuplicateCredential`] when the email is taken.
    async fn register(&self, input: RegisterInput, meta: &RequestMeta) -> Result<User, AuthError>;

    /// Checks an email-or-name identifier and password. Unknown identifiers
    /// still pay for one password verification.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown identifier, a
    /// wrong password or an inactive account alike.
    async fn login(
        &self,
        identifier: &str,
        password: &str,
        meta: &RequestMeta,
    ) -> Result<CurrentUser, AuthError>;

    /// Records the `login` audit row once the session holds the user.
    async fn record_login(
        &self,
        user: &CurrentUser,
        identifier: &str,
        meta: &RequestMeta,
    ) -> Result<(), AuthError>;

    /// Records the `logout` audit row. The caller destroys the session.
    async fn logout(&self, user: &CurrentUser, meta: &RequestMeta) -> Result<(), AuthError>;

    /// Loads the user behind a session. `None` for deleted or inactive users.
    async fn resolve(&self, user_id: UserId) -> Result<Option<CurrentUser>, AuthError>;
}
