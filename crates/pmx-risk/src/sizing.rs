//! Bet sizing output types.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use pmx_core::{KellyEstimate, Usd};

use crate::streak::StreakMultiplier;

/// How the bet amount was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMethod {
    /// External Kelly estimate, streak-scaled.
    Kelly,
    /// Naive edge-proportional size; the estimator failed or declined.
    EdgeFallback,
}

impl SizingMethod {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kelly => "kelly",
            Self::EdgeFallback => "edge_fallback",
        }
    }
}

/// Coarse size band relative to the configured max bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizingTier {
    Probe,
    Standard,
    Aggressive,
}

impl SizingTier {
    /// Band by fraction of the max bet: >=75% aggressive, >=40% standard.
    #[must_use]
    pub fn from_amount(amount: Usd, max_bet: Usd) -> Self {
        let frac = amount.ratio_of(max_bet).unwrap_or(Decimal::ZERO);
        if frac >= dec!(0.75) {
            Self::Aggressive
        } else if frac >= dec!(0.4) {
            Self::Standard
        } else {
            Self::Probe
        }
    }
}

/// A sized bet, ready for the order-placement layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sizing {
    pub amount: Usd,
    pub method: SizingMethod,
    /// The external estimate, when one was usable.
    pub kelly: Option<KellyEstimate>,
    pub sizing_tier: SizingTier,
    pub streak: StreakMultiplier,
}
