use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::error;

use super::flash;
use super::{AppState, PageError, pages};
use crate::domain::Identity;

/// GET /
pub async fn index(session: Session, Extension(identity): Extension<Identity>) -> impl IntoResponse {
    let messages = flash::take(&session).await;
    pages::welcome(&identity, &messages)
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.store().ping().await {
        Ok(()) => "ok".into_response(),
        Err(e) => {
            error!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable").into_response()
        }
    }
}

pub async fn fallback() -> Response {
    PageError::NotFound.into_response()
}
