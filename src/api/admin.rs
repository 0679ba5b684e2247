//! Administration panel. Every route here sits behind the `admin` role guard,
//! so handlers carry no role checks of their own.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;
use std::sync::Arc;

use super::auth::AuthUser;
use super::sig::json_document;
use super::validation::{parse_action, validate_id, validate_page};
use super::{ApiError, ApiResponse, AppState, GeoJsonDetailDto, GeoJsonFileDto, PageError, pages};
use crate::db::{AccessLogFilter, Role, RoleGrant};
use crate::domain::{FileId, UserId};
use crate::services::{AccessLogPage, AdminCounts, NewUserInput, UserUpdateInput, UserView};

type AdminResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Tells an absent field (`None`) apart from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn user_id(id: i32) -> Result<UserId, ApiError> {
    validate_id(id, "user").map(UserId::new)
}

fn file_id(id: i32) -> Result<FileId, ApiError> {
    validate_id(id, "file").map(FileId::new)
}

fn detail(file: crate::db::GeoJsonFile) -> Result<GeoJsonDetailDto, ApiError> {
    GeoJsonDetailDto::try_from(file)
        .map_err(|e| ApiError::internal(format!("Stored document is not JSON: {e}")))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct UsersQuery {
    pub q: Option<String>,
    pub active: Option<bool>,
}

const fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Deserialize)]
pub struct GrantsQuery {
    pub user_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct GrantRequest {
    pub user_id: i32,
    pub role_id: i32,
}

#[derive(Deserialize)]
pub struct AccessLogQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub action: Option<String>,
    pub user_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct FilesQuery {
    pub owner_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct CreateFileRequest {
    pub owner_id: i32,
    pub name: String,
    pub geojson: Box<RawValue>,
}

#[derive(Deserialize)]
pub struct UpdateFileRequest {
    pub name: Option<String>,
    pub geojson: Option<Box<RawValue>>,
}

// ============================================================================
// Index
// ============================================================================

/// GET /admin
pub async fn index(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Response, PageError> {
    let counts = state.admin().counts().await?;
    Ok(pages::admin_index(&user, &counts).into_response())
}

/// GET /admin/counts
pub async fn counts(State(state): State<Arc<AppState>>) -> AdminResult<AdminCounts> {
    let counts = state.admin().counts().await?;
    Ok(Json(ApiResponse::success(counts)))
}

/// Anything under `/admin/` that is not a known route.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("No such admin resource".to_string())
}

// ============================================================================
// Users
// ============================================================================

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsersQuery>,
) -> AdminResult<Vec<UserView>> {
    let search = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let users = state.admin().list_users(search, query.active).await?;
    Ok(Json(ApiResponse::success(users)))
}

/// POST /admin/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserView>>), ApiError> {
    let user = state
        .admin()
        .create_user(NewUserInput {
            name: body.name,
            email: body.email,
            password: body.password,
            active: body.active,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// GET /admin/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AdminResult<UserView> {
    let user = state.admin().get_user(user_id(id)?).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /admin/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateUserRequest>,
) -> AdminResult<UserView> {
    let user = state
        .admin()
        .update_user(
            user_id(id)?,
            UserUpdateInput {
                name: body.name,
                email: body.email,
                password: body.password,
                active: body.active,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// DELETE /admin/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i32>,
) -> AdminResult<()> {
    state.admin().delete_user(&actor, user_id(id)?).await?;
    Ok(Json(ApiResponse::success(())))
}

// ============================================================================
// Roles
// ============================================================================

/// GET /admin/roles
pub async fn list_roles(State(state): State<Arc<AppState>>) -> AdminResult<Vec<Role>> {
    let roles = state.admin().list_roles().await?;
    Ok(Json(ApiResponse::success(roles)))
}

/// POST /admin/roles
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Role>>), ApiError> {
    let role = state.admin().create_role(&body.name, body.description).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(role))))
}

/// GET /admin/roles/{id}
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AdminResult<Role> {
    let role = state.admin().get_role(validate_id(id, "role")?).await?;
    Ok(Json(ApiResponse::success(role)))
}

/// PUT /admin/roles/{id}
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateRoleRequest>,
) -> AdminResult<Role> {
    let role = state
        .admin()
        .update_role(validate_id(id, "role")?, body.name, body.description)
        .await?;
    Ok(Json(ApiResponse::success(role)))
}

/// DELETE /admin/roles/{id}
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AdminResult<()> {
    state.admin().delete_role(validate_id(id, "role")?).await?;
    Ok(Json(ApiResponse::success(())))
}

// ============================================================================
// Role grants
// ============================================================================

/// GET /admin/user-roles
pub async fn list_grants(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GrantsQuery>,
) -> AdminResult<Vec<RoleGrant>> {
    let owner = query.user_id.map(user_id).transpose()?;
    let grants = state.admin().list_grants(owner).await?;
    Ok(Json(ApiResponse::success(grants)))
}

/// POST /admin/user-roles
pub async fn grant_role(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GrantRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    state
        .admin()
        .grant_role(user_id(body.user_id)?, validate_id(body.role_id, "role")?)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(()))))
}

/// DELETE /admin/user-roles/{user_id}/{role_id}
pub async fn revoke_role(
    State(state): State<Arc<AppState>>,
    Path((uid, role_id)): Path<(i32, i32)>,
) -> AdminResult<()> {
    state
        .admin()
        .revoke_role(user_id(uid)?, validate_id(role_id, "role")?)
        .await?;
    Ok(Json(ApiResponse::success(())))
}

// ============================================================================
// Access logs (read-only)
// ============================================================================

/// GET /admin/access-logs
pub async fn list_access_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccessLogQuery>,
) -> AdminResult<AccessLogPage> {
    let (page, page_size) = validate_page(query.page, query.page_size)?;
    let filter = AccessLogFilter {
        action: parse_action(query.action.as_deref())?,
        user_id: query.user_id.map(user_id).transpose()?,
    };
    let logs = state.admin().list_access_logs(page, page_size, filter).await?;
    Ok(Json(ApiResponse::success(logs)))
}

// ============================================================================
// GeoJSON files
// ============================================================================

/// GET /admin/geojson-files
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilesQuery>,
) -> AdminResult<Vec<GeoJsonFileDto>> {
    let owner = query.owner_id.map(user_id).transpose()?;
    let files = state.admin().list_files(owner).await?;
    Ok(Json(ApiResponse::success(
        files.into_iter().map(GeoJsonFileDto::from).collect(),
    )))
}

/// POST /admin/geojson-files
pub async fn create_file(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateFileRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GeoJsonDetailDto>>), ApiError> {
    let content = json_document(&body.geojson)?;
    let file = state
        .admin()
        .create_file(user_id(body.owner_id)?, &body.name, content)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(detail(file)?))))
}

/// GET /admin/geojson-files/{id}
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AdminResult<GeoJsonDetailDto> {
    let file = state.admin().get_file(file_id(id)?).await?;
    Ok(Json(ApiResponse::success(detail(file)?)))
}

/// PUT /admin/geojson-files/{id}
pub async fn update_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateFileRequest>,
) -> AdminResult<GeoJsonDetailDto> {
    let content = body.geojson.as_deref().map(json_document).transpose()?;
    let file = state
        .admin()
        .update_file(file_id(id)?, body.name, content)
        .await?;
    Ok(Json(ApiResponse::success(detail(file)?)))
}

/// DELETE /admin/geojson-files/{id}
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AdminResult<()> {
    state.admin().delete_file(file_id(id)?).await?;
    Ok(Json(ApiResponse::success(())))
}
