//! Regime threshold table and base limit configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use pmx_core::{Regime, Usd};

/// Per-regime risk thresholds.
///
/// Tighter in choppy regimes, looser in trending regimes. The breaker
/// consumes `daily_loss_limit_mult` / `breach_prob_halt` / `vol_gate_pct`;
/// the Kelly multiplier is the limiter's regime base factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeThresholds {
    /// Base multiplier applied to the Kelly fraction in this regime.
    pub kelly_multiplier: Decimal,
    /// Multiplier on the configured daily loss limit.
    pub daily_loss_limit_mult: Decimal,
    /// Breach-probability forecast above which new entries are gated.
    pub breach_prob_halt: Decimal,
    /// Volatility percentile above which new entries are gated.
    pub vol_gate_pct: Decimal,
}

impl RegimeThresholds {
    /// Threshold tuple for a regime.
    #[must_use]
    pub fn for_regime(regime: Regime) -> Self {
        match regime {
            Regime::TrendingUp => Self {
                kelly_multiplier: dec!(1.1),
                daily_loss_limit_mult: dec!(1.0),
                breach_prob_halt: dec!(0.45),
                vol_gate_pct: dec!(92),
            },
            Regime::TrendingDown => Self {
                kelly_multiplier: dec!(0.9),
                daily_loss_limit_mult: dec!(1.0),
                breach_prob_halt: dec!(0.45),
                vol_gate_pct: dec!(92),
            },
            Regime::Ranging => Self {
                kelly_multiplier: dec!(1.0),
                daily_loss_limit_mult: dec!(0.8),
                breach_prob_halt: dec!(0.35),
                vol_gate_pct: dec!(88),
            },
            Regime::Choppy => Self {
                kelly_multiplier: dec!(0.6),
                daily_loss_limit_mult: dec!(0.6),
                breach_prob_halt: dec!(0.25),
                vol_gate_pct: dec!(80),
            },
        }
    }

    /// Effective daily loss limit for this regime.
    #[must_use]
    pub fn daily_loss_limit(&self, base: Usd) -> Usd {
        base * self.daily_loss_limit_mult
    }
}

/// Base limits the adaptive functions scale from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Base Kelly fraction (fraction of theoretical Kelly, e.g. quarter).
    #[serde(default = "default_base_kelly_fraction")]
    pub base_kelly_fraction: Decimal,
    /// Base daily loss limit (USD).
    #[serde(default = "default_base_daily_loss")]
    pub base_daily_loss: Usd,
    /// Base maximum drawdown percentage.
    #[serde(default = "default_base_max_drawdown_pct")]
    pub base_max_drawdown_pct: Decimal,
    /// Base maximum open positions.
    #[serde(default = "default_base_max_open_positions")]
    pub base_max_open_positions: u32,
    /// Base per-market position size as percent of bankroll.
    #[serde(default = "default_base_position_pct")]
    pub base_position_pct: Decimal,
    /// Base per-market daily loss limit (USD).
    #[serde(default = "default_per_market_daily_loss")]
    pub per_market_daily_loss: Usd,
    /// Hard ceiling on any per-market position percentage.
    #[serde(default = "default_position_pct_cap")]
    pub position_pct_cap: Decimal,
}

fn default_base_kelly_fraction() -> Decimal {
    dec!(0.25)
}

fn default_base_daily_loss() -> Usd {
    Usd::new(dec!(50))
}

fn default_base_max_drawdown_pct() -> Decimal {
    dec!(20)
}

fn default_base_max_open_positions() -> u32 {
    5
}

fn default_base_position_pct() -> Decimal {
    dec!(10)
}

fn default_per_market_daily_loss() -> Usd {
    Usd::new(dec!(15))
}

fn default_position_pct_cap() -> Decimal {
    dec!(30)
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            base_kelly_fraction: default_base_kelly_fraction(),
            base_daily_loss: default_base_daily_loss(),
            base_max_drawdown_pct: default_base_max_drawdown_pct(),
            base_max_open_positions: default_base_max_open_positions(),
            base_position_pct: default_base_position_pct(),
            per_market_daily_loss: default_per_market_daily_loss(),
            position_pct_cap: default_position_pct_cap(),
        }
    }
}
