/// Controls the permission sync run at startup.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Run the sync before the server starts accepting traffic.
    pub on_startup: bool,
    /// Give the admin role to the earliest user when nobody holds it yet.
    pub bootstrap_first_user: bool,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self {
            on_startup: crate::env_flag("SYNC_ON_STARTUP", true),
            bootstrap_first_user: crate::env_flag("SYNC_BOOTSTRAP_FIRST_USER", false),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            on_startup: true,
            bootstrap_first_user: false,
        }
    }
}
