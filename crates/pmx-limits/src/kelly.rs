//! Adaptive Kelly-fraction multiplier.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pmx_core::Regime;

use crate::thresholds::{LimitsConfig, RegimeThresholds};

/// Live context for the adaptive Kelly computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveKellyContext {
    pub regime: Regime,
    /// Recent peak-to-trough drawdown, in percent of bankroll.
    pub recent_drawdown_pct: Decimal,
    /// Current volatility percentile in `[0, 100]`.
    pub volatility_percentile: Decimal,
    /// Recent model accuracy in `[0, 1]`.
    pub model_accuracy: Decimal,
}

/// Result of the adaptive Kelly computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveKelly {
    /// Composed multiplier, clamped to `[0.05, 2.0]`.
    pub multiplier: Decimal,
    /// `base_kelly_fraction * multiplier`.
    pub recommended_fraction: Decimal,
}

const MULTIPLIER_FLOOR: Decimal = dec!(0.05);
const MULTIPLIER_CEIL: Decimal = dec!(2.0);

/// Compose the regime base multiplier with drawdown, volatility, and
/// accuracy adjustments, multiplicatively.
#[must_use]
pub fn compute_adaptive_kelly(config: &LimitsConfig, ctx: &AdaptiveKellyContext) -> AdaptiveKelly {
    let regime_mult = RegimeThresholds::for_regime(ctx.regime).kelly_multiplier;

    let drawdown_mult = if ctx.recent_drawdown_pct > dec!(30) {
        dec!(0.3)
    } else if ctx.recent_drawdown_pct > dec!(15) {
        dec!(0.6)
    } else if ctx.recent_drawdown_pct > dec!(5) {
        dec!(0.85)
    } else {
        Decimal::ONE
    };

    let vol_mult = if ctx.volatility_percentile > dec!(90) {
        dec!(0.5)
    } else if ctx.volatility_percentile > dec!(75) {
        dec!(0.75)
    } else {
        Decimal::ONE
    };

    let accuracy_mult = if ctx.model_accuracy > dec!(0.65) {
        dec!(1.15)
    } else if ctx.model_accuracy < dec!(0.45) {
        dec!(0.6)
    } else {
        Decimal::ONE
    };

    let raw = regime_mult * drawdown_mult * vol_mult * accuracy_mult;
    let multiplier = raw.clamp(MULTIPLIER_FLOOR, MULTIPLIER_CEIL);

    debug!(
        regime = %ctx.regime,
        %regime_mult,
        %drawdown_mult,
        %vol_mult,
        %accuracy_mult,
        %multiplier,
        "Adaptive Kelly multiplier"
    );

    AdaptiveKelly {
        multiplier,
        recommended_fraction: config.base_kelly_fraction * multiplier,
    }
}
