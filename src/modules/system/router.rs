use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{get_catalog, sync_permissions};

pub fn init_system_router() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(get_catalog))
        .route("/system/sync", post(sync_permissions))
}
