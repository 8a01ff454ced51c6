//! Shared domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::usd::Usd;

/// Unique trade identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(pub Uuid);

impl TradeId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Market behavior classification, produced by the upstream regime tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    /// Sustained upward price drift.
    #[serde(rename = "TREND_UP")]
    TrendingUp,
    /// Sustained downward price drift.
    #[serde(rename = "TREND_DOWN")]
    TrendingDown,
    /// Mean-reverting, range-bound behavior.
    #[serde(rename = "RANGE")]
    Ranging,
    /// Erratic, direction-less behavior. Tightest risk thresholds.
    #[serde(rename = "CHOP")]
    Choppy,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrendingUp => write!(f, "TREND_UP"),
            Self::TrendingDown => write!(f, "TREND_DOWN"),
            Self::Ranging => write!(f, "RANGE"),
            Self::Choppy => write!(f, "CHOP"),
        }
    }
}

impl Regime {
    /// True for either trending direction.
    #[must_use]
    pub fn is_trending(&self) -> bool {
        matches!(self, Self::TrendingUp | Self::TrendingDown)
    }
}

/// Which side of a binary market a trade took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Up,
    Down,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
        }
    }
}

/// Escalating circuit-breaker readiness tier.
///
/// Derived from `|daily_pnl| / daily_loss_limit`. `Tripped` implies the
/// circuit breaker is open and admission is denied until the next reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakerTier {
    #[default]
    None,
    Warning,
    Caution,
    Tripped,
}

impl fmt::Display for BreakerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Warning => write!(f, "warning"),
            Self::Caution => write!(f, "caution"),
            Self::Tripped => write!(f, "tripped"),
        }
    }
}

/// A settled trade, as recorded in the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub id: TradeId,
    pub market_id: String,
    pub category: String,
    pub side: TradeSide,
    /// Realized P&L. Positive = win.
    pub pnl: Usd,
    /// Scorer confidence at entry, in `[0, 1]`.
    pub confidence: Decimal,
    /// Regime label at entry.
    pub regime: Regime,
    pub closed_at: DateTime<Utc>,
}

impl ClosedTrade {
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.pnl.is_positive()
    }
}

/// A currently open trade, as recorded in the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub id: TradeId,
    pub market_id: String,
    pub category: String,
    pub side: TradeSide,
    /// Notional committed at entry.
    pub amount: Usd,
    /// Scorer confidence at entry, in `[0, 1]`.
    pub confidence: Decimal,
    /// Regime label at entry.
    pub regime: Regime,
    pub opened_at: DateTime<Utc>,
}

/// Scorer recommendation embedded in a signal tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRecommendation {
    pub side: TradeSide,
    /// Upstream action label (e.g., "ENTER", "SKIP").
    pub action: String,
}

/// Time-adjusted probability estimates from the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAwareAdjustment {
    pub adjusted_up: Decimal,
    pub adjusted_down: Decimal,
}

/// Current market quotes for both outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalPrices {
    pub up: Decimal,
    pub down: Decimal,
}

/// A signal tick from the upstream scoring engine.
///
/// This is the input boundary of the engine: the tick carries everything
/// bet sizing needs and nothing it should recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalTick {
    pub rec: SignalRecommendation,
    pub time_aware: TimeAwareAdjustment,
    pub prices: SignalPrices,
    pub confidence: Decimal,
    pub regime: Regime,
    pub market_id: String,
    pub category: String,
}

impl SignalTick {
    /// Model probability for the recommended side.
    #[must_use]
    pub fn model_prob(&self) -> Decimal {
        match self.rec.side {
            TradeSide::Up => self.time_aware.adjusted_up,
            TradeSide::Down => self.time_aware.adjusted_down,
        }
    }

    /// Market price for the recommended side.
    #[must_use]
    pub fn market_price(&self) -> Decimal {
        match self.rec.side {
            TradeSide::Up => self.prices.up,
            TradeSide::Down => self.prices.down,
        }
    }

    /// Model edge over the market for the recommended side, floored at zero.
    #[must_use]
    pub fn edge(&self) -> Decimal {
        let edge = self.model_prob() - self.market_price();
        if edge.is_sign_negative() {
            Decimal::ZERO
        } else {
            edge
        }
    }

    /// Reject ticks whose probabilities or prices fall outside `[0, 1]`.
    pub fn validate(&self) -> crate::error::Result<()> {
        let check = |name: &str, v: Decimal| {
            if v < Decimal::ZERO || v > Decimal::ONE {
                Err(crate::error::CoreError::InvalidProbability(format!(
                    "{name} = {v}"
                )))
            } else {
                Ok(())
            }
        };
        check("adjustedUp", self.time_aware.adjusted_up)?;
        check("adjustedDown", self.time_aware.adjusted_down)?;
        check("price.up", self.prices.up)?;
        check("price.down", self.prices.down)?;
        check("confidence", self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tick(side: TradeSide) -> SignalTick {
        SignalTick {
            rec: SignalRecommendation {
                side,
                action: "ENTER".to_string(),
            },
            time_aware: TimeAwareAdjustment {
                adjusted_up: dec!(0.62),
                adjusted_down: dec!(0.38),
            },
            prices: SignalPrices {
                up: dec!(0.55),
                down: dec!(0.45),
            },
            confidence: dec!(0.7),
            regime: Regime::Ranging,
            market_id: "btc-updown-1h".to_string(),
            category: "crypto".to_string(),
        }
    }

    #[test]
    fn test_tick_edge_up() {
        let t = tick(TradeSide::Up);
        assert_eq!(t.model_prob(), dec!(0.62));
        assert_eq!(t.market_price(), dec!(0.55));
        assert_eq!(t.edge(), dec!(0.07));
    }

    #[test]
    fn test_tick_edge_floored_at_zero() {
        let t = tick(TradeSide::Down);
        // Model 0.38 vs price 0.45: negative edge floors to zero.
        assert_eq!(t.edge(), dec!(0));
    }

    #[test]
    fn test_tick_validate_rejects_out_of_range() {
        let mut t = tick(TradeSide::Up);
        assert!(t.validate().is_ok());
        t.confidence = dec!(1.4);
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_regime_serde_labels() {
        let json = serde_json::to_string(&Regime::Choppy).unwrap();
        assert_eq!(json, "\"CHOP\"");
        let back: Regime = serde_json::from_str("\"TREND_UP\"").unwrap();
        assert_eq!(back, Regime::TrendingUp);
    }

    #[test]
    fn test_breaker_tier_ordering() {
        assert!(BreakerTier::None < BreakerTier::Warning);
        assert!(BreakerTier::Warning < BreakerTier::Caution);
        assert!(BreakerTier::Caution < BreakerTier::Tripped);
    }

    #[test]
    fn test_tick_camel_case_wire_format() {
        let t = tick(TradeSide::Up);
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"timeAware\""));
        assert!(json.contains("\"adjustedUp\""));
        assert!(json.contains("\"marketId\""));
    }
}
