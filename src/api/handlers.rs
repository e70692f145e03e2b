//! API request handlers
//!
//! All endpoint handlers for the BitTrade API.

use crate::db::{DbError, NewMessage};
use crate::trading::{outcome, TradeError};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

// ==========================================
// Response Helpers
// ==========================================

fn error_response(error: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": error })),
    )
        .into_response()
}

fn bad_request(error: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": error })),
    )
        .into_response()
}

fn not_found(error: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": error })),
    )
        .into_response()
}

fn unauthorized(error: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": error })),
    )
        .into_response()
}

// ==========================================
// Request Types
// ==========================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub username: String,
    /// Accepted as a JSON number or a numeric string; anything else is a
    /// 400 before the engine is involved.
    pub amount: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub username: String,
    pub body: String,
}

/// Parse a trade amount from a JSON number or numeric string.
fn parse_amount(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ==========================================
// Account Handlers
// ==========================================

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return bad_request("Username and password are required");
    }

    let password_hash = match bcrypt::hash(&req.password, bcrypt::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Password hashing failed: {}", e);
            return error_response("User registration failed");
        }
    };

    match state
        .db
        .create_user(username, &password_hash, &state.config.deposit_address)
        .await
    {
        Ok(user) => {
            info!("Registered user {}", user.username);
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "message": "User registered" })),
            )
                .into_response()
        }
        Err(DbError::DuplicateUsername) => bad_request("Username already exists"),
        Err(e) => {
            error!("Registration failed for {}: {}", username, e);
            error_response("User registration failed")
        }
    }
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    let user = match state.db.find_user(req.username.trim()).await {
        Ok(Some(user)) => user,
        Ok(None) => return unauthorized("Invalid credentials"),
        Err(e) => {
            error!("Login lookup failed for {}: {}", req.username, e);
            return error_response("Login failed");
        }
    };

    match bcrypt::verify(&req.password, &user.password_hash) {
        Ok(true) => Json(serde_json::json!({
            "message": "Login successful",
            "wallet": user.balance,
            "depositAddress": user.deposit_address,
        }))
        .into_response(),
        Ok(false) => unauthorized("Invalid credentials"),
        Err(e) => {
            error!("Credential check failed for {}: {}", user.username, e);
            error_response("Login failed")
        }
    }
}

// ==========================================
// Trade Handlers
// ==========================================

pub async fn trade(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TradeRequest>,
) -> Response {
    let amount = match parse_amount(&req.amount) {
        Some(amount) => amount,
        None => return bad_request("Invalid trade amount"),
    };

    match state.engine.execute(&req.username, amount).await {
        Ok(result) => {
            let mut body = serde_json::json!({
                "message": outcome::trade_message(result.result_amount),
                "wallet": outcome::format_amount(result.balance_after),
            });
            if !result.journaled {
                // Funds moved but the journal write failed: surface it
                // without failing the trade.
                warn!("Trade for {} executed but not journaled", req.username);
                body["warning"] =
                    "Trade executed but could not be recorded in history".into();
            }
            Json(body).into_response()
        }
        Err(TradeError::UnknownUser) => not_found("User not found"),
        Err(e @ TradeError::InvalidAmount(_)) => bad_request(&e.to_string()),
        Err(TradeError::Storage(e)) => {
            error!("Trade failed for {}: {}", req.username, e);
            error_response("Trade failed")
        }
    }
}

pub async fn trade_history(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Response {
    let user = match state.db.find_user(&username).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("User not found"),
        Err(e) => {
            error!("History lookup failed for {}: {}", username, e);
            return error_response("Failed to load trade history");
        }
    };

    match state.db.trades_for_user(user.id, 10).await {
        Ok(trades) => Json(trades).into_response(),
        Err(e) => {
            error!("History query failed for {}: {}", username, e);
            error_response("Failed to load trade history")
        }
    }
}

// ==========================================
// Leaderboard Handler
// ==========================================

pub async fn leaderboard(State(state): State<Arc<AppState>>) -> Response {
    match state.db.leaderboard(5).await {
        Ok(entries) => {
            let rows: Vec<serde_json::Value> = entries
                .iter()
                .map(|entry| {
                    serde_json::json!({
                        "username": entry.username,
                        "wallet": outcome::format_amount(entry.balance),
                    })
                })
                .collect();
            Json(rows).into_response()
        }
        Err(e) => {
            error!("Leaderboard query failed: {}", e);
            error_response("Failed to load leaderboard")
        }
    }
}

// ==========================================
// Message Board Handlers
// ==========================================

pub async fn recent_messages(State(state): State<Arc<AppState>>) -> Response {
    match state.db.recent_messages(10).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => {
            error!("Message query failed: {}", e);
            error_response("Failed to load messages")
        }
    }
}

pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PostMessageRequest>,
) -> Response {
    if req.username.trim().is_empty() || req.body.trim().is_empty() {
        return bad_request("Username and message body are required");
    }

    let message = NewMessage {
        username: req.username.trim().to_string(),
        body: req.body.trim().to_string(),
    };

    match state.db.insert_message(&message).await {
        Ok(saved) => (StatusCode::CREATED, Json(saved)).into_response(),
        Err(e) => {
            error!("Message insert failed: {}", e);
            error_response("Failed to post message")
        }
    }
}

// ==========================================
// Health Handler
// ==========================================

pub async fn ping() -> &'static str {
    "pong"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_amount(&serde_json::json!(50)), Some(50.0));
        assert_eq!(parse_amount(&serde_json::json!(12.5)), Some(12.5));
        assert_eq!(parse_amount(&serde_json::json!("50")), Some(50.0));
        assert_eq!(parse_amount(&serde_json::json!(" 0.25 ")), Some(0.25));
    }

    #[test]
    fn amount_rejects_everything_else() {
        assert_eq!(parse_amount(&serde_json::json!("fifty")), None);
        assert_eq!(parse_amount(&serde_json::json!("")), None);
        assert_eq!(parse_amount(&serde_json::json!(null)), None);
        assert_eq!(parse_amount(&serde_json::json!(true)), None);
        assert_eq!(parse_amount(&serde_json::json!([50])), None);
        assert_eq!(parse_amount(&serde_json::json!({"value": 50})), None);
    }
}
