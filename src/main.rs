use manuscript_search::{api::build_router, app::Components, config::Config};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "manuscript_search={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });
    let json_logs = config.observability.json_logs;
    tracing_subscriber::registry()
        .with(filter)
        .with(json_logs.then(|| fmt::layer().json()))
        .with((!json_logs).then(fmt::layer))
        .init();

    tracing::info!(
        "Starting {} v{}",
        config.observability.service_name,
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        manuscript_search::indexing::init_indexing_metrics();
        tracing::info!("Prometheus metrics initialized");
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    let components = Components::from_config(&config).await?;
    if components.engine.health().await {
        tracing::info!("Search engine reachable");
    } else {
        tracing::warn!("Search engine unreachable; search requests will fail until it is up");
    }

    let app = build_router(components.app_state(&config)).layer(TimeoutLayer::new(
        Duration::from_secs(config.server.request_timeout_secs),
    ));

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Search API: http://{}/api/v1/search/{{index}}", http_addr);
    tracing::info!("   Admin API: http://{}/api/v1/admin/search/stats", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(http_listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
            }
        })
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
