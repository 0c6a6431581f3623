//! Service entry point.

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use persuade_service::{create_router, AppState, ServiceConfig};
use persuade_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,persuade=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        paypal = config.has_paypal(),
        "starting persuade service"
    );

    let store = Arc::new(RocksStore::open(&config.data_dir)?);
    let listen_addr = config.listen_addr.clone();
    let state = Arc::new(AppState::new(store, config));
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(addr = %listen_addr, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}
