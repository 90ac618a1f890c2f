use std::sync::Arc;

use atrium_config::{CorsConfig, SessionConfig, SyncConfig};
use atrium_core::{NavigationTree, PermissionRegistry};

use crate::catalog::{build_navigation, build_registry};
use crate::store::AuthzStore;

/// Shared application state.
///
/// The registry and navigation tree are assembled once here and only read
/// afterwards.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuthzStore>,
    pub registry: Arc<PermissionRegistry>,
    pub navigation: Arc<NavigationTree>,
    pub session_config: SessionConfig,
    pub cors_config: CorsConfig,
    pub sync_config: SyncConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AuthzStore>,
        session_config: SessionConfig,
        cors_config: CorsConfig,
        sync_config: SyncConfig,
    ) -> Self {
        let registry = build_registry();
        let navigation = build_navigation(&registry);

        Self {
            store,
            registry: Arc::new(registry),
            navigation: Arc::new(navigation),
            session_config,
            cors_config,
            sync_config,
        }
    }
}
