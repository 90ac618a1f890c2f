//! Permission sync and catalog models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Summary of one permission sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    pub stats: SyncStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Catalog permissions reconciled with the store
    pub permissions_count: usize,
    /// Name of the role that holds every permission
    pub role_name: String,
    /// Whether at least one user holds that role after the run
    pub user_assigned: bool,
    /// Assignments copied from the legacy role during this run
    pub legacy_assignments_migrated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogModule {
    pub name: String,
    pub permissions: Vec<String>,
}

/// Everything the registry declares, grouped by module.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogResponse {
    pub modules: Vec<CatalogModule>,
    pub permissions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_report_shape() {
        let report = SyncReport {
            success: true,
            message: "Permissions synchronized".to_string(),
            stats: SyncStats {
                permissions_count: 42,
                role_name: "admin".to_string(),
                user_assigned: true,
                legacy_assignments_migrated: 0,
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["stats"]["permissionsCount"], 42);
        assert_eq!(json["stats"]["roleName"], "admin");
        assert_eq!(json["stats"]["userAssigned"], true);
    }
}
