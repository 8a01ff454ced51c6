//! Boundary to the external Kelly-sizing collaborator.
//!
//! The Kelly estimator itself is out of scope; the engine only consumes
//! its `{bet_pct, reason}` output. A transient estimator failure must
//! never halt trading outright, so the boundary is an explicit `Result`
//! and the caller degrades to a naive edge-proportional size.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the external sizing collaborator.
#[derive(Debug, Error)]
pub enum SizingError {
    #[error("Estimator unavailable: {0}")]
    Unavailable(String),

    #[error("Estimator rejected inputs: {0}")]
    InvalidInput(String),
}

/// Output of the external Kelly-sizing function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KellyEstimate {
    /// Recommended bet as a fraction of bankroll. Zero or negative means
    /// the estimator declined to size the trade.
    pub bet_pct: Decimal,
    /// Machine-readable explanation (e.g., "edge_below_min").
    pub reason: String,
}

impl KellyEstimate {
    /// Whether the estimate carries a usable positive fraction.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.bet_pct.is_sign_positive() && !self.bet_pct.is_zero()
    }
}

/// External Kelly-sizing collaborator.
///
/// Implementations compute a fractional-Kelly bet percentage from the
/// model probability and the current market price.
#[cfg_attr(test, mockall::automock)]
pub trait KellyEstimator: Send + Sync {
    fn estimate(
        &self,
        model_prob: Decimal,
        market_price: Decimal,
    ) -> Result<KellyEstimate, SizingError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positive_estimate() {
        let est = KellyEstimate {
            bet_pct: dec!(0.04),
            reason: "quarter_kelly".to_string(),
        };
        assert!(est.is_positive());
    }

    #[test]
    fn test_zero_estimate_not_positive() {
        let est = KellyEstimate {
            bet_pct: dec!(0),
            reason: "edge_below_min".to_string(),
        };
        assert!(!est.is_positive());
    }
}
