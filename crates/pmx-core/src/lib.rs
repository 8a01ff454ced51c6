//! Core domain types for the pmx prediction-market trading agent.
//!
//! This crate provides fundamental types used throughout the risk engine:
//! - `Usd`: Precision-safe money type
//! - `Regime`: Market behavior classification produced upstream
//! - `ClosedTrade`, `OpenTrade`: Trade lifecycle records
//! - `SignalTick`, `KellyEstimate`: Upstream collaborator payloads
//! - `KellyEstimator`: The external sizing collaborator boundary

pub mod error;
pub mod sizing;
pub mod types;
pub mod usd;

pub use error::{CoreError, Result};
pub use sizing::{KellyEstimate, KellyEstimator, SizingError};
pub use types::{
    BreakerTier, ClosedTrade, OpenTrade, Regime, SignalPrices, SignalRecommendation, SignalTick,
    TimeAwareAdjustment, TradeId, TradeSide,
};
pub use usd::Usd;
