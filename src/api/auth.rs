use axum::{
    Extension, Form,
    extract::{FromRequestParts, Query, Request, State},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{info, warn};

use super::flash::{self, FlashLevel};
use super::validation::safe_next;
use super::{ApiError, AppState, PageError, pages};
use crate::domain::{AccessAction, CurrentUser, FieldErrors, Identity, UserId};
use crate::services::{AuthError, RegisterInput, RequestMeta};

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "user_id";

const DEFAULT_LANDING: &str = "/sig";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm: String,
}

/// The authenticated caller. Rejects anonymous requests with 401.
pub struct AuthUser(pub CurrentUser);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(Identity::Authenticated(user)) => Ok(Self(user.clone())),
            _ => Err(ApiError::unauthorized()),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

fn client_ip(headers: &HeaderMap, req: &Request) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next()
        && !first.trim().is_empty()
    {
        return Some(first.trim().to_string());
    }

    req.extensions()
        .get::<axum::extract::ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
}

fn request_meta(req: &Request) -> RequestMeta {
    RequestMeta {
        method: Some(req.method().to_string()),
        path: Some(req.uri().path().to_string()),
        ip: client_ip(req.headers(), req),
    }
}

fn is_audited_path(path: &str) -> bool {
    !(path.starts_with("/static/") || path == "/health" || path == "/favicon.ico")
}

/// Resolves the session into an [`Identity`] for every request and stores it
/// (plus the request's audit metadata) in the request extensions.
///
/// A session pointing at a deleted or deactivated user is destroyed and the
/// request continues as anonymous.
pub async fn resolve_identity(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Response {
    let meta = request_meta(&req);

    let identity = match session.get::<UserId>(USER_ID_KEY).await {
        Ok(Some(user_id)) => match state.auth().resolve(user_id).await {
            Ok(Some(user)) => Identity::Authenticated(user),
            Ok(None) => {
                info!(user_id = user_id.value(), "Dropping session of a removed or inactive user");
                if let Err(e) = session.flush().await {
                    warn!(error = %e, "Failed to flush stale session");
                }
                Identity::Anonymous
            }
            Err(e) => return PageError::from(e).into_response(),
        },
        Ok(None) => Identity::Anonymous,
        Err(e) => {
            warn!(error = %e, "Unreadable session, continuing anonymously");
            Identity::Anonymous
        }
    };

    if let Some(user) = identity.user() {
        tracing::Span::current().record("user_id", user.id.value());
    }

    if state.config().audit.log_requests
        && meta.path.as_deref().is_some_and(is_audited_path)
        && let Err(e) = state
            .access_logger()
            .record(AccessAction::Request, identity.user().map(|u| u.id), None, &meta)
            .await
    {
        warn!(error = %e, "Failed to record request in access log");
    }

    req.extensions_mut().insert(identity);
    req.extensions_mut().insert(meta);
    next.run(req).await
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /auth/login
pub async fn login_page(
    session: Session,
    Extension(identity): Extension<Identity>,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    let messages = flash::take(&session).await;
    pages::login_form(&identity, &messages, "", safe_next(query.next.as_deref()), None)
}

/// POST /auth/login
/// Authenticates by email or name and starts a fresh session.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(identity): Extension<Identity>,
    Extension(meta): Extension<RequestMeta>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    let next = safe_next(form.next.as_deref());

    match state.auth().login(&form.identifier, &form.password, &meta).await {
        Ok(user) => {
            session.cycle_id().await?;
            session.insert(USER_ID_KEY, user.id).await?;
            state.auth().record_login(&user, &form.identifier, &meta).await?;
            flash::push(&session, FlashLevel::Success, format!("Welcome, {}!", user.name)).await;

            Ok(Redirect::to(next.unwrap_or(DEFAULT_LANDING)).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            let page = pages::login_form(
                &identity,
                &[],
                form.identifier.trim(),
                next,
                Some(&AuthError::InvalidCredentials.to_string()),
            );
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /auth/register
pub async fn register_page(
    session: Session,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    let messages = flash::take(&session).await;
    pages::register_form(
        &identity,
        &messages,
        &pages::RegisterValues::default(),
        &FieldErrors::new(),
    )
}

/// POST /auth/register
/// Creates the account; the user still has to log in afterwards.
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(identity): Extension<Identity>,
    Extension(meta): Extension<RequestMeta>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    let values = pages::RegisterValues {
        name: &form.name,
        email: &form.email,
    };

    let input = RegisterInput {
        name: form.name.clone(),
        email: form.email.clone(),
        password: form.password.clone(),
        confirm: form.confirm.clone(),
    };

    match state.auth().register(input, &meta).await {
        Ok(_) => {
            flash::push(
                &session,
                FlashLevel::Success,
                "Account created. You can log in now.",
            )
            .await;
            Ok(Redirect::to("/auth/login").into_response())
        }
        Err(AuthError::Validation(errors)) => {
            let page = pages::register_form(&identity, &[], &values, &errors);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(AuthError::DuplicateCredential) => {
            let errors =
                FieldErrors::single("email", AuthError::DuplicateCredential.to_string());
            let page = pages::register_form(&identity, &[], &values, &errors);
            Ok((StatusCode::CONFLICT, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /auth/logout
/// Destroys the session, then records the logout.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: Session,
    AuthUser(user): AuthUser,
    Extension(meta): Extension<RequestMeta>,
) -> Result<Response, PageError> {
    session.flush().await?;
    state.auth().logout(&user, &meta).await?;
    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_and_health_requests_are_not_audited() {
        assert!(!is_audited_path("/static/map.js"));
        assert!(!is_audited_path("/health"));
        assert!(is_audited_path("/sig/files"));
        assert!(is_audited_path("/admin/"));
    }

    #[test]
    fn forwarded_for_wins_over_peer_address() {
        let req = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_ip(req.headers(), &req).as_deref(), Some("203.0.113.9"));

        let bare = Request::builder()
            .uri("/")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_ip(bare.headers(), &bare), None);
    }
}
