//! Adaptive risk budgets for pmx.
//!
//! Pure functions that turn recent performance history and a regime
//! label into a risk budget:
//! - Adaptive Kelly-fraction multiplier
//! - Per-market position caps
//! - Stress-test loss estimates
//! - Deleveraging action lists
//!
//! Stateless between calls: every function reads the records it is
//! given and writes nothing. The regime threshold table defined here is
//! also consumed by the predictive breaker.

pub mod deleverage;
pub mod kelly;
pub mod position_limits;
pub mod stress;
pub mod thresholds;

pub use deleverage::{CloseAction, DeleveragingPlan};
pub use kelly::{AdaptiveKelly, AdaptiveKellyContext};
pub use position_limits::{AdaptiveLimits, GlobalLimits, PerMarketLimit};
pub use stress::StressScenario;
pub use thresholds::{LimitsConfig, RegimeThresholds};
