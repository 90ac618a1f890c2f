//! Atrium Observability
//!
//! Provides configurable observability features including:
//! - Structured logging to the console and rolling files
//! - Metrics collection via Prometheus
//! - HTTP request/response logging
//!
//! This crate can be enabled or disabled at compile time via the `observability` feature flag.
//! At runtime, observability can be further controlled via the `OBSERVABILITY_ENABLED` environment variable.
//! With either switch off, only console logging is installed and every tracking
//! helper is a no-op.
//!
//! # Features
//!
//! - `observability` (default): Enables file logging, request logging and metrics
//!
//! # Examples
//!
//! ```no_run
//! use atrium_observability::{init_metrics_router, init_tracing};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_tracing();
//!     let metrics = init_metrics_router();
//!     // ... merge `metrics` into the application router ...
//! }
//! ```

pub mod basic_logging;

#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;

pub use basic_logging::init_basic_console_logging;

// Public exports when observability is enabled
#[cfg(feature = "observability")]
pub use logging::{init_tracing, logging_middleware};
#[cfg(feature = "observability")]
pub use metrics::{
    init_metrics, init_metrics_router, is_observability_enabled, metrics_app,
    metrics_middleware, track_authorization_check, track_permission_sync, track_user_created,
    track_user_login,
};

// No-op stubs when observability is disabled
#[cfg(not(feature = "observability"))]
pub mod stubs {
    use axum::{Router, extract::Request, middleware::Next, response::Response};

    /// No-op observability check when feature disabled
    pub fn is_observability_enabled() -> bool {
        false
    }

    /// Console logging only when feature disabled
    pub fn init_tracing() {
        crate::basic_logging::init_basic_console_logging();
    }

    /// No-op logging middleware when feature disabled
    pub async fn logging_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    /// No-op metrics middleware when feature disabled
    pub async fn metrics_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    /// No metrics endpoint when feature disabled
    pub fn init_metrics_router() -> Option<Router> {
        None
    }

    // No-op tracking functions
    pub fn track_authorization_check(_permission: &str, _allowed: bool) {}
    pub fn track_permission_sync(_success: bool, _permissions: usize) {}
    pub fn track_user_created() {}
    pub fn track_user_login(_success: bool) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
