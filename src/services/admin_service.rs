//! Domain service behind the administration panel.
//!
//! Callers are expected to have passed the `admin` role guard already; this
//! layer only enforces data rules (uniqueness, self-deletion, existence).

use serde::Serialize;
use thiserror::Error;

use crate::db::{AccessLog, AccessLogFilter, GeoJsonFile, GeoJsonSummary, Role, RoleGrant, User};
use crate::domain::{CurrentUser, FieldErrors, FileId, UserId};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AdminError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AdminError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<FieldErrors> for AdminError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AdminCounts {
    pub users: u64,
    pub roles: u64,
    pub geojson_files: u64,
    pub access_logs: u64,
}

/// A user as shown in the panel. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub roles: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserView {
    #[must_use]
    pub fn new(user: User, roles: Vec<String>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            active: user.active,
            roles,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub active: bool,
}

/// `None` leaves a field as is. A blank password also keeps the stored hash.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessLogPage {
    pub items: Vec<AccessLog>,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

#[async_trait::async_trait]
pub trait AdminService: Send + Sync {
    async fn counts(&self) -> Result<AdminCounts, AdminError>;

    async fn list_users(
        &self,
        search: Option<&str>,
        active: Option<bool>,
    ) -> Result<Vec<UserView>, AdminError>;

    async fn get_user(&self, id: UserId) -> Result<UserView, AdminError>;

    async fn create_user(&self, input: NewUserInput) -> Result<UserView, AdminError>;

    async fn update_user(&self, id: UserId, input: UserUpdateInput)
    -> Result<UserView, AdminError>;

    /// Removes the user, their files and role grants. Audit rows survive.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Forbidden`] when `actor` targets their own account.
    async fn delete_user(&self, actor: &CurrentUser, id: UserId) -> Result<(), AdminError>;

    async fn list_roles(&self) -> Result<Vec<Role>, AdminError>;

    async fn get_role(&self, id: i32) -> Result<Role, AdminError>;

    async fn create_role(&self, name: &str, description: Option<String>)
    -> Result<Role, AdminError>;

    async fn update_role(
        &self,
        id: i32,
        name: Option<String>,
        description: Option<Option<String>>,
    ) -> Result<Role, AdminError>;

    async fn delete_role(&self, id: i32) -> Result<(), AdminError>;

    async fn list_grants(&self, user_id: Option<UserId>) -> Result<Vec<RoleGrant>, AdminError>;

    /// # Errors
    ///
    /// Returns [`AdminError::Conflict`] when the pair already exists.
    async fn grant_role(&self, user_id: UserId, role_id: i32) -> Result<(), AdminError>;

    async fn revoke_role(&self, user_id: UserId, role_id: i32) -> Result<(), AdminError>;

    /// Read-only, newest first. `page` is 1-based.
    async fn list_access_logs(
        &self,
        page: u64,
        page_size: u64,
        filter: AccessLogFilter,
    ) -> Result<AccessLogPage, AdminError>;

    async fn list_files(&self, owner: Option<UserId>) -> Result<Vec<GeoJsonSummary>, AdminError>;

    async fn get_file(&self, id: FileId) -> Result<GeoJsonFile, AdminError>;

    async fn create_file(
        &self,
        owner: UserId,
        name: &str,
        content: String,
    ) -> Result<GeoJsonFile, AdminError>;

    async fn update_file(
        &self,
        id: FileId,
        name: Option<String>,
        content: Option<String>,
    ) -> Result<GeoJsonFile, AdminError>;

    async fn delete_file(&self, id: FileId) -> Result<(), AdminError>;
}
