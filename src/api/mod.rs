//! API module - Axum HTTP server and routes

mod handlers;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main application router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ==========================================
        // Accounts
        // ==========================================
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        // ==========================================
        // Trading
        // ==========================================
        .route("/api/trade", post(handlers::trade))
        .route("/api/trades/:username", get(handlers::trade_history))
        // ==========================================
        // Leaderboard
        // ==========================================
        .route("/api/leaderboard", get(handlers::leaderboard))
        // ==========================================
        // Message Board
        // ==========================================
        .route("/api/messages", get(handlers::recent_messages))
        .route("/api/messages", post(handlers::post_message))
        // ==========================================
        // Health
        // ==========================================
        .route("/api/ping", get(handlers::ping))
        // Apply middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
