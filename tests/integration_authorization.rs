mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use atrium::atrium_models::RoleId;
use atrium::store::AuthzStore;
use common::{PASSWORD, TestApp, permission_list, send, unique_email};

// ============ Identity ============

#[tokio::test]
async fn test_missing_session_is_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/admin/roles", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized: Missing session");
}

#[tokio::test]
async fn test_forged_token_is_unauthorized() {
    let app = TestApp::new();

    let (status, _) = app.get("/api/auth/me", Some("not.a.token")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_of_deleted_user_is_unauthorized() {
    let app = TestApp::new();
    let (user, token) = app.user_with(&["roles:read"]).await;
    app.store.delete_user(user.id).await.unwrap();

    let (status, body) = app.get("/api/admin/roles", Some(&token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized: Session user no longer exists");
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let app = TestApp::new();
    let (user, token) = app.user_with(&[]).await;

    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, format!("atrium_session={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app.router.clone(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], user.email);
}

// ============ Permission checks ============

#[tokio::test]
async fn test_missing_permission_is_forbidden() {
    let app = TestApp::new();
    let (_, token) = app.user_with(&["roles:read"]).await;

    let (status, body) = app
        .post("/api/admin/roles", Some(&token), json!({ "name": "editor" }))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden: Missing permission roles:write");
}

#[tokio::test]
async fn test_held_permission_is_allowed() {
    let app = TestApp::new();
    let (_, token) = app.user_with(&["roles:read"]).await;

    let (status, body) = app.get("/api/admin/roles", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].is_array());
}

#[tokio::test]
async fn test_user_without_roles_is_forbidden_everywhere() {
    let app = TestApp::new();
    let user = app.create_user(&unique_email()).await;
    let token = app.token_for(&user);

    for uri in ["/api/admin/roles", "/api/admin/permissions", "/api/admin/users"] {
        let (status, _) = app.get(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }

    let (status, body) = app.get("/api/auth/permissions", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(permission_list(&body).is_empty());
}

#[tokio::test]
async fn test_effective_permissions_are_union_of_roles() {
    let app = TestApp::new();
    let user = app.create_user(&unique_email()).await;
    let writer = app.create_role("writer", &["blog:read", "blog:write"]).await;
    let viewer = app.create_role("viewer", &["blog:read", "pages:read"]).await;
    app.store.assign_role(user.id, writer.id).await.unwrap();
    app.store.assign_role(user.id, viewer.id).await.unwrap();

    let (status, body) = app
        .get("/api/auth/permissions", Some(&app.token_for(&user)))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        permission_list(&body),
        vec!["blog:read", "blog:write", "pages:read"]
    );
}

#[tokio::test]
async fn test_role_change_applies_on_next_request() {
    let app = TestApp::new();
    let user = app.create_user(&unique_email()).await;
    let role = app.create_role("support", &["messages:read"]).await;
    app.store.set_user_role(user.id, Some(role.id)).await.unwrap();
    let token = app.token_for(&user);

    let (status, _) = app.get("/api/admin/users", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let granted = app.create_role("support-plus", &["users:read"]).await;
    app.store
        .set_user_role(user.id, Some(granted.id))
        .await
        .unwrap();

    // Same token, new permissions
    let (status, _) = app.get("/api/admin/users", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    app.store.set_user_role(user.id, None).await.unwrap();
    let (status, _) = app.get("/api/admin/users", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_role_revokes_its_permissions() {
    let app = TestApp::new();
    let (user, token) = app.user_with(&["users:read"]).await;
    let role = app.store.user_roles(user.id).await.unwrap().remove(0);

    app.store.delete_role(role.id).await.unwrap();

    let (status, _) = app.get("/api/admin/users", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_store_outage_is_server_error() {
    let app = TestApp::new();
    let (_, token) = app.user_with(&["roles:read"]).await;
    app.store.set_unavailable(true);

    let (status, _) = app.get("/api/admin/roles", Some(&token)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unknown_role_id_in_path_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.user_with(&["roles:read"]).await;

    let (status, _) = app
        .get(&format!("/api/admin/roles/{}", RoleId::new()), Some(&token))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============ Login ============

#[tokio::test]
async fn test_login_sets_cookie_and_returns_permissions() {
    let app = TestApp::new();
    let (user, _) = app.user_with(&["blog:read"]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": user.email, "password": PASSWORD }).to_string(),
        ))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("atrium_session="));
    assert!(cookie.contains("HttpOnly"));

    let body = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(permission_list(&body), vec!["blog:read"]);

    let token = body["accessToken"].as_str().unwrap();
    let (status, me) = app.get("/api/auth/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user.id.to_string());
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = TestApp::new();
    let user = app.create_user(&unique_email()).await;

    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": user.email.to_uppercase(), "password": PASSWORD }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    let user = app.create_user(&unique_email()).await;

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": user.email, "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "nobody@test.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_malformed_body_is_bad_request() {
    let app = TestApp::new();

    let (status, _) = app
        .post("/api/auth/login", None, json!({ "email": "a@test.com" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response.headers().get(header::SET_COOKIE).unwrap();
    assert!(cookie.to_str().unwrap().starts_with("atrium_session="));
}
