use axum::http::{HeaderValue, Method};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use atrium_observability::{logging_middleware, metrics_middleware};

use crate::docs::ApiDoc;
use crate::modules::auth::router::init_auth_router;
use crate::modules::roles::router::{init_permissions_router, init_roles_router};
use crate::modules::system::router::init_system_router;
use crate::modules::users::router::init_users_router;
use crate::state::AppState;

/// Builds the application router.
///
/// `metrics` is the Prometheus scrape router, when metrics are enabled. It is
/// created by the caller because the recorder can only be installed once per
/// process.
pub fn init_router(state: AppState, metrics: Option<Router>) -> Router {
    let admin = Router::new()
        .nest("/roles", init_roles_router())
        .nest("/permissions", init_permissions_router())
        .nest("/users", init_users_router())
        .merge(init_system_router());

    let mut app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest(
            "/api",
            Router::new()
                .nest("/auth", init_auth_router())
                .nest("/admin", admin),
        )
        .with_state(state.clone());

    if let Some(metrics) = metrics {
        app = app.merge(metrics);
    }

    app.layer(cors_layer(&state))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = state
        .cors_config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}
