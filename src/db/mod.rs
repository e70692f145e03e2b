//! Database module for PostgreSQL operations using SQLx
//! Uses runtime query checking (no compile-time DATABASE_URL needed)
//!
//! This module owns the two stateful components of the trade pipeline: the
//! wallet ledger ([`Database::adjust_balance`]) and the append-only trade
//! journal ([`Database::insert_trade`] / [`Database::trades_for_user`]).

mod models;

pub use models::*;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Row};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Record not found")]
    NotFound,
    #[error("Username already taken")]
    DuplicateUsername,
    #[error("Adjustment would breach the balance floor")]
    BalanceFloor,
}

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Create a new database connection pool
    pub async fn new(database_url: &str) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        info!("Database pool created with max 10 connections");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the schema if it does not exist yet.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id SERIAL PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                balance DOUBLE PRECISION NOT NULL DEFAULT 0,
                deposit_address TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id SERIAL PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                amount DOUBLE PRECISION NOT NULL,
                outcome_ratio DOUBLE PRECISION NOT NULL,
                result_amount DOUBLE PRECISION NOT NULL,
                balance_after DOUBLE PRECISION NOT NULL,
                executed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_trades_user_executed
            ON trades (user_id, executed_at DESC, id DESC)
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id SERIAL PRIMARY KEY,
                username TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        Ok(())
    }

    // ==========================================
    // User Operations
    // ==========================================

    /// Create a new user with a zero balance.
    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        deposit_address: &str,
    ) -> Result<User, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, balance, deposit_address)
            VALUES ($1, $2, 0, $3)
            RETURNING id, username, password_hash, balance, deposit_address, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(deposit_address)
        .fetch_one(self.pool())
        .await;

        match result {
            Ok(row) => Ok(User::from_row(&row)?),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DbError::DuplicateUsername)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look a user up by username.
    pub async fn find_user(&self, username: &str) -> Result<Option<User>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, balance, deposit_address, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(User::from_row(&row)?)),
            None => Ok(None),
        }
    }

    // ==========================================
    // Wallet Ledger
    // ==========================================

    /// Atomically apply `delta` to a user's balance and return the new value.
    ///
    /// The single UPDATE is the serialization point: concurrent adjustments
    /// to the same user queue on the row, and rows for different users never
    /// contend. The change is durable once this returns.
    ///
    /// With `floor` set, a delta that would leave the balance below it is
    /// rejected with [`DbError::BalanceFloor`]; unset, balances may go
    /// arbitrarily negative.
    pub async fn adjust_balance(
        &self,
        user_id: i32,
        delta: f64,
        floor: Option<f64>,
    ) -> Result<f64, DbError> {
        let row = sqlx::query(
            r#"
            UPDATE users
            SET balance = balance + $2
            WHERE id = $1
              AND ($3::float8 IS NULL OR balance + $2 >= $3)
            RETURNING balance
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .bind(floor)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(row.try_get("balance")?),
            None => {
                // No row updated: either the user is gone or the floor
                // rejected the delta.
                let exists: Option<(i32,)> =
                    sqlx::query_as("SELECT id FROM users WHERE id = $1")
                        .bind(user_id)
                        .fetch_optional(self.pool())
                        .await?;
                if exists.is_some() {
                    Err(DbError::BalanceFloor)
                } else {
                    Err(DbError::NotFound)
                }
            }
        }
    }

    // ==========================================
    // Trade Journal
    // ==========================================

    /// Append one trade to the journal. The journal is append-only: no
    /// update or delete operations exist for this table.
    pub async fn insert_trade(&self, trade: &NewTradeRecord) -> Result<TradeRecord, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO trades (user_id, amount, outcome_ratio, result_amount, balance_after)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, amount, outcome_ratio, result_amount, balance_after, executed_at
            "#,
        )
        .bind(trade.user_id)
        .bind(trade.amount)
        .bind(trade.outcome_ratio)
        .bind(trade.result_amount)
        .bind(trade.balance_after)
        .fetch_one(self.pool())
        .await?;

        Ok(TradeRecord::from_row(&row)?)
    }

    /// Most recent trades for a user, newest first. Ties on `executed_at`
    /// fall back to insertion order.
    pub async fn trades_for_user(
        &self,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<TradeRecord>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, amount, outcome_ratio, result_amount, balance_after, executed_at
            FROM trades
            WHERE user_id = $1
            ORDER BY executed_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        let mut trades = Vec::new();
        for row in rows {
            trades.push(TradeRecord::from_row(&row)?);
        }
        Ok(trades)
    }

    // ==========================================
    // Leaderboard
    // ==========================================

    /// Top users by balance, descending. A read-only projection over the
    /// ledger.
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT username, balance
            FROM users
            ORDER BY balance DESC, username ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(LeaderboardEntry::from_row(&row)?);
        }
        Ok(entries)
    }

    // ==========================================
    // Message Board
    // ==========================================

    pub async fn insert_message(&self, message: &NewMessage) -> Result<Message, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO messages (username, body)
            VALUES ($1, $2)
            RETURNING id, username, body, created_at
            "#,
        )
        .bind(&message.username)
        .bind(&message.body)
        .fetch_one(self.pool())
        .await?;

        Ok(Message::from_row(&row)?)
    }

    pub async fn recent_messages(&self, limit: i64) -> Result<Vec<Message>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, body, created_at
            FROM messages
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(Message::from_row(&row)?);
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = Database::new(&url).await.expect("connect");
        db.init_schema().await.expect("schema");
        db
    }

    fn unique_name(prefix: &str) -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("{}_{}", prefix, nanos)
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL (set DATABASE_URL)"]
    async fn adjust_balance_unknown_user_is_not_found() {
        let db = test_db().await;
        let err = db.adjust_balance(-1, 10.0, None).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL (set DATABASE_URL)"]
    async fn adjust_balance_respects_configured_floor() {
        let db = test_db().await;
        let user = db
            .create_user(&unique_name("floor"), "hash", "addr")
            .await
            .unwrap();

        // Permissive by default: balances may go negative.
        let balance = db.adjust_balance(user.id, -25.0, None).await.unwrap();
        assert_eq!(balance, -25.0);

        // With a floor, a breaching delta is rejected and the balance is
        // left untouched.
        let err = db.adjust_balance(user.id, -100.0, Some(-50.0)).await.unwrap_err();
        assert!(matches!(err, DbError::BalanceFloor));
        let unchanged = db.adjust_balance(user.id, 0.0, None).await.unwrap();
        assert_eq!(unchanged, -25.0);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL (set DATABASE_URL)"]
    async fn duplicate_username_is_rejected() {
        let db = test_db().await;
        let name = unique_name("dup");
        db.create_user(&name, "hash", "addr").await.unwrap();
        let err = db.create_user(&name, "hash", "addr").await.unwrap_err();
        assert!(matches!(err, DbError::DuplicateUsername));
    }
}
