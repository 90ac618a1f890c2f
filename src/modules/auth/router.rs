use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{access, login, logout, me, navigation, permissions};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/permissions", get(permissions))
        .route("/navigation", get(navigation))
        .route("/access", get(access))
}
