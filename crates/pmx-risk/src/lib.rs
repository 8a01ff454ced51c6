//! Durable admission control for pmx.
//!
//! The `RiskManager` is the single gate every trade proposal must pass
//! and the authority every trade lifecycle must report through:
//! - `can_trade` / `reserve_entry`: admission checks, short-circuiting
//!   with a machine-readable denial reason
//! - `record_trade_open` / `record_trade_close`: durable state mutation
//! - multi-tier circuit breaker with a rolling loss-velocity window
//! - recovery mode after a tripped day
//! - streak-scaled Kelly bet sizing with an explicit fallback

pub mod config;
pub mod error;
pub mod manager;
pub mod rollover;
pub mod sizing;
pub mod streak;

pub use config::RiskConfig;
pub use error::{RiskError, RiskResult};
pub use manager::{Admission, DenyReason, RiskManager, RiskStatus};
pub use rollover::spawn_daily_reset;
pub use sizing::{Sizing, SizingMethod, SizingTier};
pub use streak::{compute_streak_multiplier, StreakDirection, StreakMultiplier};
