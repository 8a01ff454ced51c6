//! Built-in fractional Kelly estimator.
//!
//! Default implementation of the sizing collaborator boundary for
//! deployments without an external estimator service. For a binary
//! market bought at price `P` with model win probability `p`, the payoff
//! odds are `b = (1 - P) / P` and the full-Kelly fraction is
//! `(b * p - (1 - p)) / b`, scaled down by the configured fraction.

use rust_decimal::Decimal;

use pmx_core::{KellyEstimate, KellyEstimator, SizingError};

/// Fractional Kelly over binary-market odds.
pub struct FractionalKelly {
    fraction: Decimal,
}

impl FractionalKelly {
    /// `fraction` is the share of full Kelly to bet (e.g. 0.25).
    #[must_use]
    pub fn new(fraction: Decimal) -> Self {
        Self { fraction }
    }
}

impl KellyEstimator for FractionalKelly {
    fn estimate(
        &self,
        model_prob: Decimal,
        market_price: Decimal,
    ) -> Result<KellyEstimate, SizingError> {
        let in_unit = |v: Decimal| v > Decimal::ZERO && v < Decimal::ONE;
        if !in_unit(model_prob) || !in_unit(market_price) {
            return Err(SizingError::InvalidInput(format!(
                "probability {model_prob} / price {market_price} outside (0, 1)"
            )));
        }

        let b = (Decimal::ONE - market_price) / market_price;
        let q = Decimal::ONE - model_prob;
        let full = (b * model_prob - q) / b;

        if full <= Decimal::ZERO {
            return Ok(KellyEstimate {
                bet_pct: Decimal::ZERO,
                reason: "no_edge".to_string(),
            });
        }

        Ok(KellyEstimate {
            bet_pct: full * self.fraction,
            reason: "fractional_kelly".to_string(),
        })
    }
}
