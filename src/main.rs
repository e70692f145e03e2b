//! BitTrade - Simulated Trading Backend
//!
//! HTTP/JSON API over a PostgreSQL-backed wallet ledger and trade journal.

mod api;
mod config;
mod db;
mod trading;

use crate::api::create_router;
use crate::config::AppConfig;
use crate::db::Database;
use crate::trading::TradeEngine;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Application state shared across all handlers
pub struct AppState {
    pub db: Database,
    pub engine: TradeEngine,
    pub config: AppConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig::from_env();

    info!("BitTrade backend v1.0 starting");
    info!(
        "Outcome bounds: [{:.2}, {:.2}], wallet floor: {:?}",
        config.outcome_lower, config.outcome_upper, config.wallet_floor
    );

    // Initialize database
    info!("Connecting to database...");
    let db = Database::new(&config.database_url).await?;
    db.init_schema().await?;
    info!("Database ready");

    // Trade execution engine
    let engine = TradeEngine::new(db.clone(), config.outcome_bounds(), config.wallet_floor);

    // Create application state
    let port = config.port;
    let state = Arc::new(AppState { db, engine, config });

    // Create router with all API endpoints
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting API server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
