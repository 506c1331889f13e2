use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use snipper::allocator::build_allocator;
use snipper::config::Config;
use snipper::links::{LinkStore, LinkStoreOptions};
use snipper::storage::open_backend;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("snipper=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let backend = open_backend(&config.database, &config.cache).await?;
    info!("Storage initialized successfully");

    let allocator = build_allocator(config.codes.policy, config.codes.length, backend.sequence);
    info!(
        policy = ?config.codes.policy,
        length = config.codes.length,
        max_attempts = config.codes.max_attempts,
        "Short code allocator ready"
    );

    let links = Arc::new(LinkStore::new(
        backend.storage,
        allocator,
        LinkStoreOptions {
            max_attempts: config.codes.max_attempts,
            deduplicate: config.deduplicate_urls,
        },
    ));

    let app = snipper::create_app(links, &config);

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🚀 Server listening on http://{}", addr);
    info!("   - Short links resolve under {}/", config.base_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
