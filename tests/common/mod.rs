#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use fake::Fake;
use fake::faker::name::en::Name;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use atrium::atrium_auth::create_session_token;
use atrium::atrium_config::{CorsConfig, SessionConfig, SyncConfig};
use atrium::atrium_core::PermissionName;
use atrium::atrium_core::password::hash_password_with_cost;
use atrium::atrium_models::{NewUser, Role, SyncReport, User};
use atrium::modules::system::service::sync_permissions;
use atrium::router::init_router;
use atrium::state::AppState;
use atrium::store::{AuthzStore, MemoryAuthzStore};

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryAuthzStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_sync_config(SyncConfig {
            on_startup: false,
            bootstrap_first_user: false,
        })
    }

    pub fn with_sync_config(sync_config: SyncConfig) -> Self {
        let store = Arc::new(MemoryAuthzStore::new());
        let state = AppState::new(
            store.clone(),
            SessionConfig::default(),
            CorsConfig::from_list("http://localhost:3000"),
            sync_config,
        );
        let router = init_router(state.clone(), None);

        Self {
            router,
            state,
            store,
        }
    }

    pub async fn sync(&self) -> SyncReport {
        sync_permissions(
            self.store.as_ref(),
            &self.state.registry,
            &self.state.sync_config,
        )
        .await
        .unwrap()
    }

    pub async fn create_user(&self, email: &str) -> User {
        // Low bcrypt cost keeps the suite fast
        let password_hash = hash_password_with_cost(PASSWORD, 4).unwrap();
        let name: String = Name().fake();

        self.store
            .create_user(NewUser {
                email: email.to_string(),
                name,
                password_hash,
            })
            .await
            .unwrap()
    }

    /// Creates `name` holding exactly `permissions`, creating missing permissions.
    pub async fn create_role(&self, name: &str, permissions: &[&str]) -> Role {
        let mut ids = std::collections::BTreeSet::new();
        for raw in permissions {
            let parsed = PermissionName::parse(raw).unwrap();
            let permission = self
                .store
                .ensure_permission(&parsed, &parsed.default_description())
                .await
                .unwrap();
            ids.insert(permission.id);
        }

        let role = self.store.create_role(name, None).await.unwrap();
        self.store
            .replace_role_permissions(role.id, &ids)
            .await
            .unwrap();
        role
    }

    /// A user holding a fresh role with exactly `permissions`, and their token.
    pub async fn user_with(&self, permissions: &[&str]) -> (User, String) {
        let user = self.create_user(&unique_email()).await;
        let role = self
            .create_role(&format!("role-{}", Uuid::new_v4()), permissions)
            .await;
        self.store
            .set_user_role(user.id, Some(role.id))
            .await
            .unwrap();

        let token = self.token_for(&user);
        (user, token)
    }

    pub fn token_for(&self, user: &User) -> String {
        create_session_token(
            user.id.into_inner(),
            &user.email,
            &self.state.session_config,
        )
        .unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("PUT", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("DELETE", uri, token, None).await
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        send(self.router.clone(), request).await
    }
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    if body.is_empty() {
        return (status, Value::Null);
    }

    let json = serde_json::from_slice(&body).unwrap_or_else(|_| {
        panic!(
            "Response is not JSON. Status: {}, Body: {:?}",
            status,
            String::from_utf8_lossy(&body)
        )
    });
    (status, json)
}

pub fn unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

/// Sorted permission strings from a `{"permissions": [...]}` body.
pub fn permission_list(body: &Value) -> Vec<String> {
    let mut permissions: Vec<String> = body["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_str().unwrap().to_string())
        .collect();
    permissions.sort();
    permissions
}
