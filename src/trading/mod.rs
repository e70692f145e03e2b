//! Trading module - outcome generation and trade execution

pub mod engine;
pub mod outcome;

pub use engine::{TradeEngine, TradeError, TradeOutcome};
pub use outcome::OutcomeBounds;
