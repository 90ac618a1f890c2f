//! Reconciles the stored permissions and the admin role with the registry.
//!
//! The run is a sequence of idempotent steps without an enclosing transaction:
//!
//! 1. create every catalog permission that is missing
//! 2. create the `admin` role if needed
//! 3. set the admin role's permissions to every stored permission
//! 4. copy assignments of the legacy `Admin` role onto `admin`
//! 5. optionally give `admin` to the earliest user when nobody holds it
//!
//! A failure leaves whatever the earlier steps wrote in place.

use std::collections::BTreeSet;

use tracing::{debug, error, info, instrument, warn};

use atrium_config::SyncConfig;
use atrium_core::{AppError, PermissionName, PermissionRegistry};
use atrium_models::{CatalogModule, CatalogResponse, PermissionId, SyncReport, SyncStats};
use atrium_observability::track_permission_sync;

use crate::state::AppState;
use crate::store::AuthzStore;

pub const ADMIN_ROLE_NAME: &str = "admin";
pub const LEGACY_ADMIN_ROLE_NAME: &str = "Admin";
pub const ADMIN_ROLE_DESCRIPTION: &str = "System Administrator with full access";

#[instrument(skip_all)]
pub async fn sync_permissions(
    store: &dyn AuthzStore,
    registry: &PermissionRegistry,
    config: &SyncConfig,
) -> Result<SyncReport, AppError> {
    let mut permissions_count = 0;
    for raw in registry.all_permission_strings() {
        let name = match PermissionName::parse(raw) {
            Ok(name) => name,
            Err(e) => {
                warn!(permission = %raw, error = %e, "Skipping malformed catalog permission");
                continue;
            }
        };

        store
            .ensure_permission(&name, &name.default_description())
            .await?;
        permissions_count += 1;
    }
    debug!(permissions_count, "Catalog permissions ensured");

    let admin = store
        .ensure_role(ADMIN_ROLE_NAME, Some(ADMIN_ROLE_DESCRIPTION))
        .await?;

    let every_permission: BTreeSet<PermissionId> = store
        .all_permissions()
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    let diff = store
        .replace_role_permissions(admin.id, &every_permission)
        .await?;
    debug!(
        added = diff.to_add.len(),
        removed = diff.to_remove.len(),
        "Admin role permissions reconciled"
    );

    let mut legacy_assignments_migrated = 0;
    if let Some(legacy) = store.find_role_by_name(LEGACY_ADMIN_ROLE_NAME).await? {
        if legacy.id != admin.id {
            for user_id in store.users_with_role(legacy.id).await? {
                if store.assign_role(user_id, admin.id).await? {
                    legacy_assignments_migrated += 1;
                }
            }
            if legacy_assignments_migrated > 0 {
                info!(
                    migrated = legacy_assignments_migrated,
                    "Copied legacy Admin assignments to admin"
                );
            }
        }
    }

    let mut holders = store.users_with_role(admin.id).await?;
    if holders.is_empty() && config.bootstrap_first_user {
        if let Some(user) = store.first_user().await? {
            store.assign_role(user.id, admin.id).await?;
            info!(user_id = %user.id, email = %user.email, "Assigned admin role to first user");
            holders.push(user.id);
        }
    }

    Ok(SyncReport {
        success: true,
        message: "Permissions synced successfully".to_string(),
        stats: SyncStats {
            permissions_count,
            role_name: admin.name,
            user_assigned: !holders.is_empty(),
            legacy_assignments_migrated,
        },
    })
}

/// Runs the sync for process startup. Failures are logged and swallowed so the
/// server still comes up.
pub async fn run_startup_sync(state: &AppState) -> Option<SyncReport> {
    match sync_permissions(state.store.as_ref(), &state.registry, &state.sync_config).await {
        Ok(report) => {
            track_permission_sync(true, report.stats.permissions_count);
            info!(
                permissions = report.stats.permissions_count,
                user_assigned = report.stats.user_assigned,
                "Permission sync completed"
            );
            Some(report)
        }
        Err(e) => {
            track_permission_sync(false, 0);
            error!(error = ?e.error, "Permission sync failed");
            None
        }
    }
}

/// The registry grouped by module, plus the flat sorted list.
pub fn catalog(registry: &PermissionRegistry) -> CatalogResponse {
    let modules = registry
        .grouped()
        .into_iter()
        .map(|(name, permissions)| CatalogModule {
            name,
            permissions: permissions.into_iter().collect(),
        })
        .collect();

    CatalogResponse {
        modules,
        permissions: registry.all_permission_strings().iter().cloned().collect(),
    }
}
