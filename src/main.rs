use anyhow::Context;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};
use minio_bridge::{
    config::Config,
    routes::create_router,
    storage::{self, Storage},
    utils::init_logger,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let _log_guard = init_logger(config.server.log_dir.as_deref());
    info!("Configuration loaded: {:?}", config.server);

    // Connect to object storage
    let store = storage::connect(&config.storage).context("Failed to create storage client")?;
    let storage = Storage::new(store, &config.storage);
    info!(
        provider = %config.storage.provider,
        endpoint = %config.storage.endpoint,
        bucket = %storage.default_bucket(),
        "Storage client ready"
    );

    // Uploads create the bucket on demand, so an unreachable store is not fatal here
    if let Err(e) = storage.ensure_bucket(storage.default_bucket()).await {
        warn!("Could not verify default bucket: {}", e);
    }

    let state = AppState::new(config.clone(), storage);
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("HOST and PORT must form a valid socket address")?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
