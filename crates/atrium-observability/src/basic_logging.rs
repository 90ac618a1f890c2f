use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize console-only logging.
///
/// Used when observability is compiled out or switched off at runtime, and by
/// the CLI. `LOG_LEVEL` (default "info") sets the level of the Atrium crates
/// unless `RUST_LOG` is given.
pub fn init_basic_console_logging() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "atrium={log_level},atrium_cli={log_level},tower_http=warn,hyper=warn,sqlx=warn"
        ))
    });

    let console_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    // try_init: tests and the CLI may install a subscriber first
    let _ = tracing_subscriber::registry().with(console_layer).try_init();
}
