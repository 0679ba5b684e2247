use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{any, get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

use crate::config::Config;
use crate::db::Store;
use crate::domain::ADMIN_ROLE;
use crate::services::{AccessLogger, AdminService, AuthService, SigService};
use crate::state::SharedState;

mod admin;
mod assets;
pub mod auth;
mod error;
pub mod flash;
pub mod guard;
mod observability;
pub mod pages;
mod sig;
mod types;
mod validation;
mod welcome;

pub use error::{ApiError, PageError};
pub use types::*;

/// Multipart framing on top of the document itself.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn sig(&self) -> &Arc<dyn SigService> {
        &self.shared.sig_service
    }

    #[must_use]
    pub fn admin(&self) -> &Arc<dyn AdminService> {
        &self.shared.admin_service
    }

    #[must_use]
    pub fn access_logger(&self) -> &AccessLogger {
        &self.shared.access_logger
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let config = state.config();

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name("devgis_session")
        .with_secure(config.server.secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.server.session_inactivity_minutes,
        )));

    let cors_origins = &config.server.cors_allowed_origins;
    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    let body_limit = config.sig.max_upload_bytes.saturating_add(BODY_LIMIT_SLACK);

    Router::new()
        .merge(public_routes())
        .merge(authenticated_routes())
        .merge(admin_routes())
        .fallback(welcome::fallback)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_identity,
        ))
        .layer(session_layer)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        // The `request` span must be the current span when identity is resolved.
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .with_state(state)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(welcome::index))
        .route("/health", get(welcome::health))
        .route("/static/{*path}", get(assets::serve_asset))
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route(
            "/auth/register",
            get(auth::register_page).post(auth::register),
        )
}

fn authenticated_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/sig", get(sig::index))
        .route("/sig/", get(sig::index))
        .route("/sig/files", get(sig::files).post(sig::upload_form))
        .route("/sig/files/{id}/delete", post(sig::delete_form))
        .route("/sig/load-examples", post(sig::load_examples))
        .route("/sig/map", get(sig::map))
        .route("/sig/api/my-geojsons", get(sig::api_my_geojsons))
        .route("/sig/api/upload", post(sig::api_upload))
        .route(
            "/sig/api/files/{id}",
            get(sig::api_get_file).delete(sig::api_delete_file),
        )
        .route_layer(middleware::from_fn(guard::require_authenticated))
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin", get(admin::index))
        .route("/admin/", get(admin::index))
        .route("/admin/counts", get(admin::counts))
        .route("/admin/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/admin/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/admin/roles", get(admin::list_roles).post(admin::create_role))
        .route(
            "/admin/roles/{id}",
            get(admin::get_role)
                .put(admin::update_role)
                .delete(admin::delete_role),
        )
        .route(
            "/admin/user-roles",
            get(admin::list_grants).post(admin::grant_role),
        )
        .route(
            "/admin/user-roles/{user_id}/{role_id}",
            axum::routing::delete(admin::revoke_role),
        )
        .route("/admin/access-logs", get(admin::list_access_logs))
        .route(
            "/admin/geojson-files",
            get(admin::list_files).post(admin::create_file),
        )
        .route(
            "/admin/geojson-files/{id}",
            get(admin::get_file)
                .put(admin::update_file)
                .delete(admin::delete_file),
        )
        .route("/admin/metrics", get(observability::get_metrics))
        .route("/admin/{*rest}", any(admin::not_found))
        .route_layer(middleware::from_fn_with_state(
            guard::RequiredRole(ADMIN_ROLE),
            guard::role_guard,
        ))
}
