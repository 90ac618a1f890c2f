mod common;

use axum::http::StatusCode;

use atrium::atrium_config::SyncConfig;
use atrium::atrium_core::PermissionName;
use atrium::modules::system::service::{ADMIN_ROLE_NAME, LEGACY_ADMIN_ROLE_NAME, run_startup_sync};
use atrium::store::AuthzStore;
use common::{TestApp, unique_email};

async fn admin_role_permission_count(app: &TestApp) -> usize {
    let admin = app
        .store
        .find_role_by_name(ADMIN_ROLE_NAME)
        .await
        .unwrap()
        .unwrap();
    app.store.role_permissions(admin.id).await.unwrap().len()
}

#[tokio::test]
async fn test_sync_is_idempotent() {
    let app = TestApp::new();

    let first = app.sync().await;
    let permissions = app.store.permission_count().await;
    let roles = app.store.role_count().await;
    let second = app.sync().await;

    assert_eq!(first, second);
    assert_eq!(app.store.permission_count().await, permissions);
    assert_eq!(app.store.role_count().await, roles);
    assert_eq!(
        first.stats.permissions_count,
        app.state.registry.all_permission_strings().len()
    );
}

#[tokio::test]
async fn test_admin_role_holds_every_stored_permission() {
    let app = TestApp::new();
    app.sync().await;

    // Created outside the registry
    let extra = PermissionName::parse("newsletter:send").unwrap();
    app.store.create_permission(&extra, None).await.unwrap();
    app.sync().await;

    assert_eq!(
        admin_role_permission_count(&app).await,
        app.store.permission_count().await
    );
}

#[tokio::test]
async fn test_sync_restores_manually_removed_admin_permissions() {
    let app = TestApp::new();
    app.sync().await;
    let admin = app
        .store
        .find_role_by_name(ADMIN_ROLE_NAME)
        .await
        .unwrap()
        .unwrap();
    app.store
        .replace_role_permissions(admin.id, &Default::default())
        .await
        .unwrap();

    app.sync().await;

    assert_eq!(
        admin_role_permission_count(&app).await,
        app.store.permission_count().await
    );
}

#[tokio::test]
async fn test_sync_keeps_existing_descriptions() {
    let app = TestApp::new();
    let name = PermissionName::parse("blog:read").unwrap();
    app.store
        .create_permission(&name, Some("Read the blog"))
        .await
        .unwrap();

    app.sync().await;

    let all = app.store.all_permissions().await.unwrap();
    let blog_read = all.iter().find(|p| p.name == "blog:read").unwrap();
    assert_eq!(blog_read.description.as_deref(), Some("Read the blog"));
    let blog_write = all.iter().find(|p| p.name == "blog:write").unwrap();
    assert_eq!(
        blog_write.description.as_deref(),
        Some("Permission to write blog")
    );
}

#[tokio::test]
async fn test_legacy_admin_holders_receive_admin() {
    let app = TestApp::new();
    let legacy = app.store.create_role(LEGACY_ADMIN_ROLE_NAME, None).await.unwrap();
    let user = app.create_user(&unique_email()).await;
    app.store.assign_role(user.id, legacy.id).await.unwrap();

    let report = app.sync().await;

    assert_eq!(report.stats.legacy_assignments_migrated, 1);
    assert!(report.stats.user_assigned);
    let names: Vec<String> = app
        .store
        .user_roles(user.id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["Admin", "admin"]);

    // Already copied
    let again = app.sync().await;
    assert_eq!(again.stats.legacy_assignments_migrated, 0);
}

#[tokio::test]
async fn test_bootstrap_disabled_leaves_admin_unassigned() {
    let app = TestApp::new();
    app.create_user(&unique_email()).await;

    let report = app.sync().await;

    assert!(!report.stats.user_assigned);
}

#[tokio::test]
async fn test_bootstrap_enabled_assigns_first_user_once() {
    let app = TestApp::with_sync_config(SyncConfig {
        on_startup: true,
        bootstrap_first_user: true,
    });
    let first = app.create_user(&unique_email()).await;

    let report = run_startup_sync(&app.state).await.unwrap();
    assert!(report.stats.user_assigned);

    app.create_user(&unique_email()).await;
    app.sync().await;

    let admin = app
        .store
        .find_role_by_name(ADMIN_ROLE_NAME)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        app.store.users_with_role(admin.id).await.unwrap(),
        vec![first.id]
    );
}

#[tokio::test]
async fn test_startup_sync_failure_does_not_panic() {
    let app = TestApp::new();
    app.store.set_unavailable(true);

    assert!(run_startup_sync(&app.state).await.is_none());
}

// ============ HTTP ============

#[tokio::test]
async fn test_sync_endpoint_returns_summary() {
    let app = TestApp::new();
    let (_, token) = app.user_with(&["roles:write"]).await;

    let (status, body) = app
        .post("/api/admin/system/sync", Some(&token), serde_json::json!({}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Permissions synced successfully");
    assert_eq!(body["stats"]["roleName"], "admin");
    assert_eq!(body["stats"]["userAssigned"], false);
    assert!(body["stats"]["permissionsCount"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_sync_endpoint_requires_roles_write() {
    let app = TestApp::new();
    let (_, token) = app.user_with(&["roles:read"]).await;

    let (status, _) = app
        .post("/api/admin/system/sync", Some(&token), serde_json::json!({}))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_catalog_endpoint_groups_by_module() {
    let app = TestApp::new();
    let (_, token) = app.user_with(&["roles:read"]).await;

    let (status, body) = app.get("/api/admin/catalog", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    let modules = body["modules"].as_array().unwrap();
    let forms = modules.iter().find(|m| m["name"] == "forms").unwrap();
    assert_eq!(
        forms["permissions"],
        serde_json::json!(["forms:delete", "forms:read", "forms:write"])
    );
    assert_eq!(
        body["permissions"].as_array().unwrap().len(),
        app.state.registry.all_permission_strings().len()
    );
}
