//! Greedy deleveraging planner.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use pmx_core::{ClosedTrade, OpenTrade, Usd};

/// A single recommended close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseAction {
    pub market_id: String,
    pub amount: Usd,
    pub reason: String,
}

/// Ordered close list bringing exposure back under a ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleveragingPlan {
    pub actions: Vec<CloseAction>,
    pub current_exposure: Usd,
    pub target_exposure: Usd,
    /// Exposure remaining if every action is executed.
    pub projected_exposure: Usd,
}

impl DeleveragingPlan {
    /// Whether the plan reaches its target.
    #[must_use]
    pub fn reaches_target(&self) -> bool {
        self.projected_exposure <= self.target_exposure
    }
}

/// Rank open trades worst-first (lowest realized market P&L, then lowest
/// confidence) and accumulate closes until total exposure is at or below
/// `target_exposure`.
#[must_use]
pub fn deleveraging_plan(
    target_exposure: Usd,
    recent: &[ClosedTrade],
    open: &[OpenTrade],
) -> DeleveragingPlan {
    let mut market_pnl: HashMap<&str, Usd> = HashMap::new();
    for trade in recent {
        *market_pnl.entry(trade.market_id.as_str()).or_insert(Usd::ZERO) += trade.pnl;
    }

    let current_exposure: Usd = open.iter().map(|t| t.amount).sum();

    let mut ranked: Vec<&OpenTrade> = open.iter().collect();
    ranked.sort_by(|a, b| {
        let pnl_a = market_pnl.get(a.market_id.as_str()).copied().unwrap_or(Usd::ZERO);
        let pnl_b = market_pnl.get(b.market_id.as_str()).copied().unwrap_or(Usd::ZERO);
        pnl_a
            .cmp(&pnl_b)
            .then_with(|| a.confidence.cmp(&b.confidence))
    });

    let mut projected = current_exposure;
    let mut actions = Vec::new();
    for trade in ranked {
        if projected <= target_exposure {
            break;
        }
        let pnl = market_pnl
            .get(trade.market_id.as_str())
            .copied()
            .unwrap_or(Usd::ZERO);
        let reason = if pnl.is_negative() {
            format!("market_pnl_negative:{pnl}")
        } else if trade.confidence < Decimal::new(5, 1) {
            format!("low_confidence:{}", trade.confidence)
        } else {
            "exposure_reduction".to_string()
        };
        projected -= trade.amount;
        actions.push(CloseAction {
            market_id: trade.market_id.clone(),
            amount: trade.amount,
            reason,
        });
    }

    if !actions.is_empty() {
        info!(
            closes = actions.len(),
            current = %current_exposure,
            target = %target_exposure,
            projected = %projected,
            "Deleveraging plan"
        );
    }

    DeleveragingPlan {
        actions,
        current_exposure,
        target_exposure,
        projected_exposure: projected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pmx_core::{Regime, TradeId, TradeSide};
    use rust_decimal_macros::dec;

    fn closed(market: &str, pnl: &str) -> ClosedTrade {
        ClosedTrade {
            id: TradeId::new(),
            market_id: market.to_string(),
            category: "crypto".to_string(),
            side: TradeSide::Up,
            pnl: pnl.parse().unwrap(),
            confidence: dec!(0.6),
            regime: Regime::Ranging,
            closed_at: Utc::now(),
        }
    }

    fn open(market: &str, amount: &str, confidence: Decimal) -> OpenTrade {
        OpenTrade {
            id: TradeId::new(),
            market_id: market.to_string(),
            category: "crypto".to_string(),
            side: TradeSide::Up,
            amount: amount.parse().unwrap(),
            confidence,
            regime: Regime::Ranging,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn test_closes_worst_market_first() {
        let recent = vec![closed("loser", "-5"), closed("winner", "5")];
        let book = vec![open("winner", "10", dec!(0.7)), open("loser", "10", dec!(0.7))];

        let plan = deleveraging_plan(Usd::new(dec!(10)), &recent, &book);
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].market_id, "loser");
        assert!(plan.actions[0].reason.starts_with("market_pnl_negative"));
        assert!(plan.reaches_target());
    }

    #[test]
    fn test_ties_broken_by_low_confidence() {
        let book = vec![
            open("a", "10", dec!(0.8)),
            open("b", "10", dec!(0.3)),
        ];
        let plan = deleveraging_plan(Usd::new(dec!(10)), &[], &book);
        assert_eq!(plan.actions[0].market_id, "b");
        assert!(plan.actions[0].reason.starts_with("low_confidence"));
    }

    #[test]
    fn test_stops_once_target_reached() {
        let book = vec![
            open("a", "10", dec!(0.5)),
            open("b", "10", dec!(0.5)),
            open("c", "10", dec!(0.5)),
        ];
        let plan = deleveraging_plan(Usd::new(dec!(15)), &[], &book);
        // 30 -> close two (20 off would overshoot but one close leaves 20 > 15).
        assert_eq!(plan.actions.len(), 2);
        assert_eq!(plan.projected_exposure, Usd::new(dec!(10)));
    }

    #[test]
    fn test_already_under_target_is_empty_plan() {
        let book = vec![open("a", "5", dec!(0.5))];
        let plan = deleveraging_plan(Usd::new(dec!(10)), &[], &book);
        assert!(plan.actions.is_empty());
        assert!(plan.reaches_target());
    }

    #[test]
    fn test_may_close_everything_and_still_report() {
        let book = vec![open("a", "5", dec!(0.5))];
        let plan = deleveraging_plan(Usd::ZERO, &[], &book);
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.projected_exposure, Usd::ZERO);
    }
}
