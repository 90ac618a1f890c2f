use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::{error, instrument};

use atrium_models::{CatalogResponse, SyncReport, SyncStats};
use atrium_observability::track_permission_sync;

use crate::middleware::auth::{RequireRolesRead, RequireRolesWrite};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;

use super::service::{self, ADMIN_ROLE_NAME};

/// Run the permission sync on demand
///
/// Same reconciliation as the startup sync. Failures are reported with
/// `success: false`; details go to the server log only.
#[utoipa::path(
    post,
    path = "/api/admin/system/sync",
    responses(
        (status = 200, description = "Sync completed", body = SyncReport),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - missing roles:write", body = ErrorResponse),
        (status = 500, description = "Sync failed", body = SyncReport)
    ),
    security(("bearer_auth" = [])),
    tag = "System"
)]
#[instrument(skip_all)]
pub async fn sync_permissions(
    State(state): State<AppState>,
    _auth: RequireRolesWrite,
) -> (StatusCode, Json<SyncReport>) {
    match service::sync_permissions(state.store.as_ref(), &state.registry, &state.sync_config).await
    {
        Ok(report) => {
            track_permission_sync(true, report.stats.permissions_count);
            (StatusCode::OK, Json(report))
        }
        Err(e) => {
            track_permission_sync(false, 0);
            error!(error = ?e.error, "On-demand permission sync failed");
            let report = SyncReport {
                success: false,
                message: "Permission sync failed".to_string(),
                stats: SyncStats {
                    permissions_count: 0,
                    role_name: ADMIN_ROLE_NAME.to_string(),
                    user_assigned: false,
                    legacy_assignments_migrated: 0,
                },
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(report))
        }
    }
}

/// List the permission catalog grouped by module
#[utoipa::path(
    get,
    path = "/api/admin/catalog",
    responses(
        (status = 200, description = "Permission catalog", body = CatalogResponse),
        (status = 403, description = "Forbidden - missing roles:read", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "System"
)]
pub async fn get_catalog(
    State(state): State<AppState>,
    _auth: RequireRolesRead,
) -> Json<CatalogResponse> {
    Json(service::catalog(&state.registry))
}
