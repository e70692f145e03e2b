//! Trade execution service.
//!
//! Orchestrates one simulated trade: resolve the user, validate the amount,
//! sample an outcome ratio, apply the wallet adjustment, append the journal
//! row. The adjustment and the append run under a per-user lock so journal
//! order always matches the order the ledger serialized the adjustments.

use crate::db::{Database, DbError, NewTradeRecord};
use crate::trading::outcome::{self, OutcomeBounds};

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum TradeError {
    #[error("User not found")]
    UnknownUser,
    #[error("Invalid trade amount: {0}")]
    InvalidAmount(String),
    #[error("Database error: {0}")]
    Storage(#[from] DbError),
}

/// Result of an executed trade.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub outcome_ratio: f64,
    pub result_amount: f64,
    pub balance_after: f64,
    /// False when the wallet adjustment applied but the journal append
    /// failed: funds moved, history is incomplete for this trade.
    pub journaled: bool,
}

/// Per-user mutual exclusion map. A lock is created on first use and shared
/// for the lifetime of the process; distinct users never contend.
#[derive(Default)]
pub struct UserLocks {
    inner: DashMap<i32, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn lock_for(&self, user_id: i32) -> Arc<Mutex<()>> {
        self.inner
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

pub struct TradeEngine {
    db: Database,
    bounds: OutcomeBounds,
    floor: Option<f64>,
    locks: UserLocks,
}

impl TradeEngine {
    pub fn new(db: Database, bounds: OutcomeBounds, floor: Option<f64>) -> Self {
        Self {
            db,
            bounds,
            floor,
            locks: UserLocks::default(),
        }
    }

    /// Execute a simulated trade of `amount` for `username`.
    ///
    /// Validation failures leave no trace: no wallet adjustment, no journal
    /// row. Once the adjustment has applied it is never rolled back; a
    /// journal failure after it is reported through
    /// [`TradeOutcome::journaled`]. There are no automatic retries, and a
    /// caller retry runs a second, independently-random trade.
    pub async fn execute(&self, username: &str, amount: f64) -> Result<TradeOutcome, TradeError> {
        let user = self
            .db
            .find_user(username)
            .await?
            .ok_or(TradeError::UnknownUser)?;

        validate_amount(amount)?;

        let ratio = outcome::sample_ratio(&mut rand::thread_rng(), &self.bounds);
        let result_amount = amount * ratio;

        // Critical section: the UPDATE serializes adjustments on the user
        // row, and holding the lock across the append keeps journal order
        // identical to the ledger's serialization order. Other users take
        // other locks.
        let lock = self.locks.lock_for(user.id);
        let _guard = lock.lock().await;

        let balance_after = match self.db.adjust_balance(user.id, result_amount, self.floor).await {
            Ok(balance) => balance,
            // User deleted between lookup and adjustment.
            Err(DbError::NotFound) => return Err(TradeError::UnknownUser),
            Err(DbError::BalanceFloor) => {
                return Err(TradeError::InvalidAmount(format!(
                    "a loss of {:.4} would breach the wallet floor",
                    result_amount.abs()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let record = NewTradeRecord {
            user_id: user.id,
            amount,
            outcome_ratio: ratio,
            result_amount,
            balance_after,
        };

        let journaled = match self.db.insert_trade(&record).await {
            Ok(_) => true,
            Err(e) => {
                // The adjustment is already durable; never roll it back.
                error!(
                    "Journal append failed after wallet adjustment for {}: {}",
                    username, e
                );
                false
            }
        };

        info!(
            "Trade for {}: amount={:.4} ratio={:.2} result={:.4} balance={:.4}",
            username, amount, ratio, result_amount, balance_after
        );

        Ok(TradeOutcome {
            outcome_ratio: ratio,
            result_amount,
            balance_after,
            journaled,
        })
    }
}

/// A trade amount must be a finite number strictly greater than zero.
pub fn validate_amount(amount: f64) -> Result<(), TradeError> {
    if !amount.is_finite() {
        return Err(TradeError::InvalidAmount(format!(
            "{} is not a finite number",
            amount
        )));
    }
    if amount <= 0.0 {
        return Err(TradeError::InvalidAmount(format!(
            "{} is not greater than zero",
            amount
        )));
    }
    Ok(())
}
