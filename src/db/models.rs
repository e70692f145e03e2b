//! Database models matching the PostgreSQL schema

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

/// Registered user account.
///
/// `balance` is the authoritative wallet value; only the ledger adjustment
/// in [`crate::db::Database::adjust_balance`] writes it.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub balance: f64,
    pub deposit_address: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            balance: row.try_get("balance")?,
            deposit_address: row.try_get("deposit_address")?,
            created_at: row.try_get("created_at").ok(),
        })
    }
}

/// One executed trade in the append-only journal.
#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub id: i32,
    pub user_id: i32,
    pub amount: f64,
    pub outcome_ratio: f64,
    pub result_amount: f64,
    pub balance_after: f64,
    pub executed_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for TradeRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            amount: row.try_get("amount")?,
            outcome_ratio: row.try_get("outcome_ratio")?,
            result_amount: row.try_get("result_amount")?,
            balance_after: row.try_get("balance_after")?,
            executed_at: row.try_get("executed_at").ok(),
        })
    }
}

/// Trade to append; id and timestamp are assigned by the journal.
#[derive(Debug, Clone)]
pub struct NewTradeRecord {
    pub user_id: i32,
    pub amount: f64,
    pub outcome_ratio: f64,
    pub result_amount: f64,
    pub balance_after: f64,
}

/// Message board entry.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i32,
    pub username: String,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for Message {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            body: row.try_get("body")?,
            created_at: row.try_get("created_at").ok(),
        })
    }
}

/// New message to post.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub username: String,
    pub body: String,
}

/// One leaderboard row: a username and its current balance.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub balance: f64,
}

impl<'r> FromRow<'r, PgRow> for LeaderboardEntry {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            username: row.try_get("username")?,
            balance: row.try_get("balance")?,
        })
    }
}
