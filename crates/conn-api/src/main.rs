//! Connection service REST API server.

use conn_api::server::{self, AppState};
use conn_service::{ConnectionService, KvStore, ServiceConfig};
use conn_store::InMemoryKvStore;
use conn_worker::PoolTaskRunner;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env()?;
    let storage = open_store()?;
    let service = Arc::new(ConnectionService::new(
        storage,
        Arc::new(PoolTaskRunner::new()),
        config,
    )?);
    service.boot();

    let app = server::router(Arc::new(AppState {
        service: Arc::clone(&service),
    }));
    let addr: SocketAddr = std::env::var("CONN_LISTEN")
        .unwrap_or_else(|_| "0.0.0.0:8002".to_string())
        .parse()?;
    tracing::info!(weight = service.weight(), "connection API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    service.shutdown();
    tracing::info!(state = service.state().as_str(), "connection API stopped");
    Ok(())
}

#[cfg(feature = "sqlite")]
fn open_store() -> Result<Arc<dyn KvStore>, Box<dyn std::error::Error + Send + Sync>> {
    match std::env::var("CONN_SQLITE_PATH") {
        Ok(path) => {
            tracing::info!(path = %path, "using sqlite store");
            Ok(Arc::new(conn_store::SqliteKvStore::open(path)?))
        }
        Err(_) => Ok(Arc::new(InMemoryKvStore::new())),
    }
}

#[cfg(not(feature = "sqlite"))]
fn open_store() -> Result<Arc<dyn KvStore>, Box<dyn std::error::Error + Send + Sync>> {
    Ok(Arc::new(InMemoryKvStore::new()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
