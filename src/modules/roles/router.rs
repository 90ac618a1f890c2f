use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

use super::controller::{
    create_permission, create_role, delete_permission, delete_role, get_permissions, get_role,
    get_role_permissions, get_roles, update_permission, update_role,
};

pub fn init_roles_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_roles).post(create_role))
        .route("/{id}", get(get_role).put(update_role).delete(delete_role))
        .route("/{id}/permissions", get(get_role_permissions))
}

pub fn init_permissions_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_permissions).post(create_permission))
        .route("/{id}", put(update_permission).delete(delete_permission))
}
