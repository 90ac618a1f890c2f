//! # Atrium Config
//!
//! Configuration types for the Atrium API.
//!
//! Every structure is loaded from environment variables with a development
//! default for anything optional:
//!
//! - [`session`]: Session token signing and cookie settings
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`database`]: Postgres connection settings
//! - [`server`]: Listen address
//! - [`sync`]: Permission sync behaviour at startup
//!
//! # Example
//!
//! ```ignore
//! use atrium_config::{CorsConfig, DatabaseConfig, SessionConfig};
//!
//! dotenvy::dotenv().ok();
//! let session_config = SessionConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let database_config = DatabaseConfig::from_env()?;
//! ```

pub mod cors;
pub mod database;
pub mod server;
pub mod session;
pub mod sync;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use database::{DatabaseConfig, MissingVariable};
pub use server::ServerConfig;
pub use session::SessionConfig;
pub use sync::SyncConfig;

/// Reads a boolean flag. `1`/`true`/`yes` (any case) are true, anything else false.
pub(crate) fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
