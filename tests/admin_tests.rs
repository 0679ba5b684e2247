mod common;

use axum::http::StatusCode;
use common::{TestApp, body_json, body_text, location, point};
use devgis::db::AccessLogFilter;
use serde_json::json;

async fn with_admin() -> (TestApp, String) {
    let app = TestApp::spawn().await;
    app.create_superuser("Root", "root@example.com", "rootpass1").await;
    let cookie = app.login("root@example.com", "rootpass1").await;
    (app, cookie)
}

#[tokio::test]
async fn anonymous_visitors_are_sent_to_login() {
    let app = TestApp::spawn().await;

    for path in ["/admin/", "/admin/users", "/admin/no-such-page"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert!(location(&response).starts_with("/auth/login?next=%2Fadmin"));
    }
}

#[tokio::test]
async fn regular_users_are_forbidden() {
    let app = TestApp::spawn().await;
    app.create_superuser("Root", "root@example.com", "rootpass1").await;
    app.create_user("Alice", "alice@example.com", "wonderland").await;
    let alice = app.login("alice@example.com", "wonderland").await;

    let response = app.get("/admin/", Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let page = body_text(response).await;
    assert!(!page.contains("Administration"));

    let response = app.get("/admin/users", Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let page = body_text(response).await;
    assert!(!page.contains("root@example.com"));

    let response = app.delete("/admin/users/1", Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.count_users().await.unwrap(), 2);
}

#[tokio::test]
async fn superuser_reaches_the_panel_and_lists_users() {
    let (app, root) = with_admin().await;
    app.create_user("Alice", "alice@example.com", "wonderland").await;

    let response = app.get("/admin/", Some(&root)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Administration"));

    let response = app.get("/admin/users", Some(&root)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(!text.contains("password"));
    assert!(!text.contains("$argon2"));

    let body: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["success"], true);
    let emails: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap().to_string())
        .collect();
    assert!(emails.contains(&"root@example.com".to_string()));
    assert!(emails.contains(&"alice@example.com".to_string()));

    let response = app.get("/admin/users?q=alice", Some(&root)).await;
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = app.get("/admin/no-such-page", Some(&root)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn superuser_command_resets_an_existing_account() {
    let app = TestApp::spawn().await;
    app.create_superuser("Root", "root@example.com", "first-pass").await;
    app.create_superuser("Root Again", "root@example.com", "second-pass")
        .await;

    assert_eq!(app.store.count_users().await.unwrap(), 1);
    let cookie = app.login("root@example.com", "second-pass").await;
    let response = app.get("/admin/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn user_crud_through_the_panel() {
    let (app, root) = with_admin().await;

    let response = app
        .send_json(
            "POST",
            "/admin/users",
            Some(&root),
            &json!({ "name": "Carol", "email": "carol@example.com", "password": "carol-pass" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let carol_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .send_json(
            "POST",
            "/admin/users",
            Some(&root),
            &json!({ "name": "Carol 2", "email": "CAROL@example.com", "password": "carol-pass" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .send_json(
            "PUT",
            &format!("/admin/users/{carol_id}"),
            Some(&root),
            &json!({ "name": "Caroline", "password": "" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["name"], "Caroline");
    app.login("carol@example.com", "carol-pass").await;

    let response = app
        .send_json(
            "POST",
            "/admin/users",
            Some(&root),
            &json!({ "name": "x", "email": "bad", "password": "1" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admins_cannot_delete_themselves() {
    let (app, root) = with_admin().await;
    let me = app
        .store
        .user_repo()
        .get_by_email("root@example.com")
        .await
        .unwrap()
        .unwrap();

    let response = app
        .delete(&format!("/admin/users/{}", me.id), Some(&root))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn deleting_a_user_cascades_but_keeps_the_audit_trail() {
    let (app, root) = with_admin().await;
    let bob = app.create_user("Bob", "bob@example.com", "builder1").await;
    let bob_cookie = app.login("bob@example.com", "builder1").await;

    let response = app
        .send_json(
            "POST",
            "/sig/api/upload",
            Some(&bob_cookie),
            &json!({ "name": "bob.geojson", "geojson": point("bob") }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let bob_logs = AccessLogFilter {
        user_id: Some(bob.id),
        ..Default::default()
    };
    let (before, _) = app
        .store
        .access_log_repo()
        .list(1, 50, &bob_logs)
        .await
        .unwrap();
    assert!(!before.is_empty());

    let response = app
        .delete(&format!("/admin/users/{}", bob.id), Some(&root))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .get(&format!("/admin/geojson-files?owner_id={}", bob.id), Some(&root))
        .await;
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());

    let (after, _) = app
        .store
        .access_log_repo()
        .list(1, 50, &bob_logs)
        .await
        .unwrap();
    assert_eq!(after.len(), before.len());

    let response = app.get("/sig/api/my-geojsons", Some(&bob_cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn access_logs_are_read_only_and_only_grow() {
    let (app, root) = with_admin().await;
    let first = app.store.count_access_logs().await.unwrap();
    assert!(first >= 1);

    let response = app.delete("/admin/access-logs", Some(&root)).await;
    assert!(!response.status().is_success());
    let response = app.delete("/admin/access-logs/1", Some(&root)).await;
    assert!(!response.status().is_success());

    app.login("root@example.com", "rootpass1").await;
    let second = app.store.count_access_logs().await.unwrap();
    assert!(second > first);

    let response = app
        .get("/admin/access-logs?action=login&page_size=10", Some(&root))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i["action"] == "login"));

    let response = app.get("/admin/access-logs?action=nuke", Some(&root)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn roles_and_grants() {
    let (app, root) = with_admin().await;
    let alice = app.create_user("Alice", "alice@example.com", "wonderland").await;

    let response = app
        .send_json(
            "POST",
            "/admin/roles",
            Some(&root),
            &json!({ "name": "editor", "description": "Edits layers" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let role_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let grant = json!({ "user_id": alice.id.value(), "role_id": role_id });
    let response = app
        .send_json("POST", "/admin/user-roles", Some(&root), &grant)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = app
        .send_json("POST", "/admin/user-roles", Some(&root), &grant)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .get(&format!("/admin/user-roles?user_id={}", alice.id), Some(&root))
        .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = app
        .delete(&format!("/admin/roles/{role_id}"), Some(&root))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .get(&format!("/admin/user-roles?user_id={}", alice.id), Some(&root))
        .await;
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_role_survives_rename_and_delete_attempts() {
    let (app, root) = with_admin().await;
    let admin_role = app
        .store
        .role_repo()
        .get_by_name("admin")
        .await
        .unwrap()
        .unwrap();
    let path = format!("/admin/roles/{}", admin_role.id);

    let response = app
        .send_json("PUT", &path, Some(&root), &json!({ "name": "staff" }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.delete(&path, Some(&root)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get("/admin/", Some(&root)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.get(&path, Some(&root)).await;
    assert_eq!(body_json(response).await["data"]["name"], "admin");
}

#[tokio::test]
async fn granting_admin_opens_the_panel() {
    let (app, root) = with_admin().await;
    let alice = app.create_user("Alice", "alice@example.com", "wonderland").await;
    let alice_cookie = app.login("alice@example.com", "wonderland").await;

    let response = app.get("/admin/", Some(&alice_cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin_role = app
        .store
        .role_repo()
        .get_by_name("admin")
        .await
        .unwrap()
        .unwrap();
    let response = app
        .send_json(
            "POST",
            "/admin/user-roles",
            Some(&root),
            &json!({ "user_id": alice.id.value(), "role_id": admin_role.id }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.get("/admin/", Some(&alice_cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_manages_any_users_files() {
    let (app, root) = with_admin().await;
    let alice = app.create_user("Alice", "alice@example.com", "wonderland").await;

    let response = app
        .send_json(
            "POST",
            "/admin/geojson-files",
            Some(&root),
            &json!({ "owner_id": alice.id.value(), "name": "seeded", "geojson": point("seeded") }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .send_json(
            "PUT",
            &format!("/admin/geojson-files/{id}"),
            Some(&root),
            &json!({ "name": "renamed" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let alice_cookie = app.login("alice@example.com", "wonderland").await;
    let body = body_json(app.get("/sig/api/my-geojsons", Some(&alice_cookie)).await).await;
    assert_eq!(body[0]["name"], "renamed");

    let response = app
        .delete(&format!("/admin/geojson-files/{id}"), Some(&root))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .get(&format!("/admin/geojson-files/{id}"), Some(&root))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_report_disabled_by_default() {
    let (app, root) = with_admin().await;
    let response = app.get("/admin/metrics", Some(&root)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
