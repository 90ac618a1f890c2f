use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;

use atrium::atrium_config::{CorsConfig, DatabaseConfig, ServerConfig, SessionConfig, SyncConfig};
use atrium::atrium_db::{init_db_pool, run_migrations};
use atrium::modules::system::service::run_startup_sync;
use atrium::router::init_router;
use atrium::state::AppState;
use atrium::store::PgAuthzStore;
use atrium_observability::{init_metrics_router, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let database_config = DatabaseConfig::from_env()?;
    let server_config = ServerConfig::from_env();
    let sync_config = SyncConfig::from_env();

    let pool = init_db_pool(&database_config)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let store = Arc::new(PgAuthzStore::new(pool));
    let state = AppState::new(
        store,
        SessionConfig::from_env(),
        CorsConfig::from_env(),
        sync_config,
    );

    if state.sync_config.on_startup {
        run_startup_sync(&state).await;
    }

    let app = init_router(state, init_metrics_router());

    let address = server_config.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    info!(%address, "Server running");
    info!("Swagger UI available at http://{address}/swagger-ui");
    info!("Scalar UI available at http://{address}/scalar");

    axum::serve(listener, app).await?;
    Ok(())
}
