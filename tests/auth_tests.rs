mod common;

use axum::http::StatusCode;
use common::{TestApp, body_text, location, session_cookie};
use devgis::db::AccessLogFilter;
use devgis::domain::AccessAction;

#[tokio::test]
async fn health_and_welcome_are_public() {
    let app = TestApp::spawn().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("content-security-policy")
            .is_some()
    );
    assert!(body_text(response).await.contains("Welcome to devgis"));
}

#[tokio::test]
async fn register_then_login_by_email_or_name() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/register",
            None,
            &[
                ("name", "Alice"),
                ("email", "alice@example.com"),
                ("password", "wonderland"),
                ("confirm", "wonderland"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");

    let cookie = app.login("alice@example.com", "wonderland").await;
    let response = app.get("/", Some(&cookie)).await;
    assert!(body_text(response).await.contains("Welcome back, Alice"));

    app.login("alice", "wonderland").await;
}

#[tokio::test]
async fn duplicate_registration_keeps_the_first_password() {
    let app = TestApp::spawn().await;
    app.create_user("Alice", "alice@example.com", "first-secret").await;

    let response = app
        .post_form(
            "/auth/register",
            None,
            &[
                ("name", "Mallory"),
                ("email", "Alice@Example.com"),
                ("password", "second-secret"),
                ("confirm", "second-secret"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_text(response).await.contains("Email already registered"));

    app.login("alice@example.com", "first-secret").await;
    let response = app
        .post_form(
            "/auth/login",
            None,
            &[("identifier", "alice@example.com"), ("password", "second-secret")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn invalid_registration_is_rerendered_with_field_errors() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/register",
            None,
            &[
                ("name", "A"),
                ("email", "not-an-email"),
                ("password", "abc"),
                ("confirm", "abd"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let page = body_text(response).await;
    assert!(page.contains("field-error"));
    assert!(page.contains("not-an-email"));
    assert_eq!(app.store.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn successful_login_is_audited_once_with_its_session() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("Alice", "alice@example.com", "wonderland").await;
    let cookie = app.login(" alice@example.com ", "wonderland").await;

    let logins = AccessLogFilter {
        action: Some(AccessAction::Login),
        ..Default::default()
    };
    let (rows, total) = app
        .store
        .access_log_repo()
        .list(1, 50, &logins)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].user_id, Some(alice.id.value()));
    assert_eq!(rows[0].credential.as_deref(), Some("alice@example.com"));

    let response = app.get("/sig", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_yields_no_identity() {
    let app = TestApp::spawn().await;
    app.create_user("Alice", "alice@example.com", "wonderland").await;

    let response = app
        .post_form(
            "/auth/login",
            None,
            &[("identifier", "alice@example.com"), ("password", "looking-glass")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookie = session_cookie(&response);
    let page = body_text(response).await;
    assert!(page.contains("Invalid credentials or inactive account"));

    let response = app.get("/sig/api/my-geojsons", cookie.as_deref()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(
        app.store
            .count_access_logs_by_action(AccessAction::LoginFailed)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn unknown_and_inactive_accounts_get_the_same_answer() {
    let app = TestApp::spawn().await;
    let user = app.create_user("Dormant", "dormant@example.com", "sleeping").await;
    app.store
        .user_repo()
        .update(
            user.id,
            devgis::db::UserChanges {
                active: Some(false),
                ..Default::default()
            },
            &app.config.security,
        )
        .await
        .unwrap();

    let inactive = app
        .post_form(
            "/auth/login",
            None,
            &[("identifier", "dormant@example.com"), ("password", "sleeping")],
        )
        .await;
    let unknown = app
        .post_form(
            "/auth/login",
            None,
            &[("identifier", "nobody@example.com"), ("password", "sleeping")],
        )
        .await;

    assert_eq!(inactive.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(inactive).await.contains("Invalid credentials or inactive account"));
    assert!(body_text(unknown).await.contains("Invalid credentials or inactive account"));
}

#[tokio::test]
async fn login_follows_local_next_only() {
    let app = TestApp::spawn().await;
    app.create_user("Alice", "alice@example.com", "wonderland").await;

    let response = app
        .post_form(
            "/auth/login",
            None,
            &[
                ("identifier", "alice@example.com"),
                ("password", "wonderland"),
                ("next", "/sig/map"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/sig/map");

    let response = app
        .post_form(
            "/auth/login",
            None,
            &[
                ("identifier", "alice@example.com"),
                ("password", "wonderland"),
                ("next", "//evil.example/steal"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/sig");
}

#[tokio::test]
async fn next_with_control_characters_falls_back_to_landing() {
    let app = TestApp::spawn().await;
    app.create_user("Alice", "alice@example.com", "wonderland").await;

    for next in ["/sig\nx", "/x\r\nSet-Cookie: a=b", "/sig\u{7f}"] {
        let response = app
            .post_form(
                "/auth/login",
                None,
                &[
                    ("identifier", "alice@example.com"),
                    ("password", "wonderland"),
                    ("next", next),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{next:?}");
        assert_eq!(location(&response), "/sig");

        let cookie = session_cookie(&response).expect("session cookie");
        let response = app.get("/sig", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::spawn().await;
    app.create_user("Alice", "alice@example.com", "wonderland").await;
    let cookie = app.login("alice@example.com", "wonderland").await;

    let response = app.post_form("/auth/logout", Some(&cookie), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app.get("/sig/api/my-geojsons", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.store
            .count_access_logs_by_action(AccessAction::Logout)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn protected_pages_redirect_anonymous_users_to_login() {
    let app = TestApp::spawn().await;

    let response = app.get("/sig/files", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?next=%2Fsig%2Ffiles");

    let response = app.get("/does-not-exist", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
