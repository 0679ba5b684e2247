//! Route gates. Decisions are made once per router, before any handler runs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::warn;

use super::{ApiError, PageError};
use crate::domain::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Anonymous,
    MissingRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// Anonymous callers are always denied; others need `role` in their set.
#[must_use]
pub fn require_role(identity: &Identity, role: &str) -> Decision {
    match identity.user() {
        None => Decision::Deny(DenyReason::Anonymous),
        Some(user) if user.has_role(role) => Decision::Allow,
        Some(_) => Decision::Deny(DenyReason::MissingRole),
    }
}

/// Role a router demands, used as middleware state.
#[derive(Debug, Clone, Copy)]
pub struct RequiredRole(pub &'static str);

/// Login URL that brings the user back to `path_and_query` afterwards.
#[must_use]
pub fn login_redirect_target(path_and_query: &str) -> String {
    format!("/auth/login?next={}", urlencoding::encode(path_and_query))
}

fn requested_path(req: &Request) -> String {
    req.uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string())
}

fn identity_of(req: &Request) -> Identity {
    req.extensions().get::<Identity>().cloned().unwrap_or_default()
}

pub async fn role_guard(
    State(RequiredRole(role)): State<RequiredRole>,
    req: Request,
    next: Next,
) -> Response {
    let identity = identity_of(&req);
    match require_role(&identity, role) {
        Decision::Allow => next.run(req).await,
        Decision::Deny(DenyReason::Anonymous) => {
            Redirect::to(&login_redirect_target(&requested_path(&req))).into_response()
        }
        Decision::Deny(DenyReason::MissingRole) => {
            warn!(
                user_id = identity.user().map(|u| u.id.value()),
                role,
                path = %req.uri().path(),
                "Role check failed"
            );
            PageError::Forbidden.into_response()
        }
    }
}

/// Lets any authenticated user through. JSON endpoints under `/sig/api/`
/// answer 401 instead of redirecting.
pub async fn require_authenticated(req: Request, next: Next) -> Response {
    if identity_of(&req).is_authenticated() {
        return next.run(req).await;
    }

    if req.uri().path().starts_with("/sig/api/") {
        ApiError::unauthorized().into_response()
    } else {
        Redirect::to(&login_redirect_target(&requested_path(&req))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ADMIN_ROLE, CurrentUser, UserId};

    fn signed_in(roles: &[&str]) -> Identity {
        Identity::Authenticated(CurrentUser {
            id: UserId::new(1),
            name: "alice".to_string(),
            email: "alice@x.io".to_string(),
            roles: roles.iter().map(ToString::to_string).collect(),
        })
    }

    #[test]
    fn anonymous_is_denied() {
        assert_eq!(
            require_role(&Identity::Anonymous, ADMIN_ROLE),
            Decision::Deny(DenyReason::Anonymous)
        );
    }

    #[test]
    fn missing_role_is_denied() {
        assert_eq!(
            require_role(&signed_in(&["editor"]), ADMIN_ROLE),
            Decision::Deny(DenyReason::MissingRole)
        );
        assert_eq!(
            require_role(&signed_in(&[]), ADMIN_ROLE),
            Decision::Deny(DenyReason::MissingRole)
        );
    }

    #[test]
    fn holder_of_the_role_is_allowed() {
        assert_eq!(
            require_role(&signed_in(&["editor", ADMIN_ROLE]), ADMIN_ROLE),
            Decision::Allow
        );
    }

    #[test]
    fn login_redirect_keeps_the_target() {
        assert_eq!(
            login_redirect_target("/admin/users?q=a b"),
            "/auth/login?next=%2Fadmin%2Fusers%3Fq%3Da%20b"
        );
    }
}
