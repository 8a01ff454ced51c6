//! Live stress-test scenario generators.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pmx_core::{ClosedTrade, OpenTrade, Usd};

use crate::thresholds::LimitsConfig;

/// One stress scenario with its estimated loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    pub expected_loss: Usd,
    pub affected_markets: Vec<String>,
    /// Subjective probability attached to the scenario.
    pub probability: Decimal,
    /// True when the expected loss exceeds the global daily limit.
    pub alert: bool,
}

/// Run the three scenario generators over recent history and the current
/// open book.
///
/// `shock_pct` is a fraction (0.10 = a 10% adverse shock).
#[must_use]
pub fn run_stress_test(
    config: &LimitsConfig,
    recent: &[ClosedTrade],
    open: &[OpenTrade],
    shock_pct: Decimal,
) -> Vec<StressScenario> {
    let limit = config.base_daily_loss;
    let scenarios = vec![
        uniform_shock(recent, shock_pct, limit),
        category_concentration_shock(open, shock_pct, limit),
        regime_flip_shock(open, limit),
    ];
    for s in &scenarios {
        if s.alert {
            debug!(scenario = %s.name, expected_loss = %s.expected_loss, "Stress alert");
        }
    }
    scenarios
}

/// Uniform shock across every traded market, weighted by realized
/// activity: sum of |avg pnl| x trade count x shock.
fn uniform_shock(recent: &[ClosedTrade], shock_pct: Decimal, limit: Usd) -> StressScenario {
    let mut per_market: HashMap<String, (u32, Usd)> = HashMap::new();
    for trade in recent {
        let entry = per_market
            .entry(trade.market_id.clone())
            .or_insert((0, Usd::ZERO));
        entry.0 += 1;
        entry.1 += trade.pnl;
    }

    let mut expected_loss = Usd::ZERO;
    let mut affected: Vec<String> = Vec::new();
    for (market, (trades, pnl_sum)) in &per_market {
        let avg_abs = (*pnl_sum / Decimal::from(*trades)).abs();
        expected_loss += avg_abs * Decimal::from(*trades) * shock_pct;
        affected.push(market.clone());
    }
    affected.sort();

    StressScenario {
        name: "uniform_shock".to_string(),
        alert: expected_loss > limit,
        expected_loss,
        affected_markets: affected,
        probability: dec!(0.10),
    }
}

/// Concentration shock against the single most exposed category, with a
/// 2x penalty for correlated unwind.
fn category_concentration_shock(
    open: &[OpenTrade],
    shock_pct: Decimal,
    limit: Usd,
) -> StressScenario {
    let mut by_category: BTreeMap<&str, (Usd, Vec<String>)> = BTreeMap::new();
    for trade in open {
        let entry = by_category
            .entry(trade.category.as_str())
            .or_insert((Usd::ZERO, Vec::new()));
        entry.0 += trade.amount;
        entry.1.push(trade.market_id.clone());
    }

    let worst = by_category
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0));

    let (expected_loss, affected) = match worst {
        Some((_, (exposure, mut markets))) => {
            markets.sort();
            markets.dedup();
            (exposure * shock_pct * dec!(2), markets)
        }
        None => (Usd::ZERO, Vec::new()),
    };

    StressScenario {
        name: "category_concentration".to_string(),
        alert: expected_loss > limit,
        expected_loss,
        affected_markets: affected,
        probability: dec!(0.05),
    }
}

/// Regime flip: positions entered under a trending label are impaired by
/// 30% when the trend breaks.
fn regime_flip_shock(open: &[OpenTrade], limit: Usd) -> StressScenario {
    let mut expected_loss = Usd::ZERO;
    let mut affected: Vec<String> = Vec::new();
    for trade in open {
        if trade.regime.is_trending() {
            expected_loss += trade.amount * dec!(0.3);
            affected.push(trade.market_id.clone());
        }
    }
    affected.sort();
    affected.dedup();

    StressScenario {
        name: "regime_flip".to_string(),
        alert: expected_loss > limit,
        expected_loss,
        affected_markets: affected,
        probability: dec!(0.15),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pmx_core::{Regime, TradeId, TradeSide};

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

    fn open(market: &str, category: &str, amount: &str, regime: Regime) -> OpenTrade {
        OpenTrade {
            id: TradeId::new(),
            market_id: market.to_string(),
            category: category.to_string(),
            side: TradeSide::Up,
            amount: amount.parse().unwrap(),
            confidence: dec!(0.6),
            regime,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn test_uniform_shock_weights_by_activity() {
        let recent = vec![closed("a", "2"), closed("a", "-4"), closed("b", "1")];
        let scenarios = run_stress_test(&LimitsConfig::default(), &recent, &[], dec!(0.5));
        let uniform = &scenarios[0];
        assert_eq!(uniform.name, "uniform_shock");
        // a: |avg -1| * 2 trades * 0.5 = 1; b: 1 * 1 * 0.5 = 0.5
        assert_eq!(uniform.expected_loss, Usd::new(dec!(1.5)));
        assert_eq!(uniform.affected_markets, vec!["a", "b"]);
    }

    #[test]
    fn test_category_shock_doubles_worst_category() {
        let open_book = vec![
            open("m1", "crypto", "20", Regime::Ranging),
            open("m2", "crypto", "10", Regime::Ranging),
            open("m3", "sports", "5", Regime::Ranging),
        ];
        let scenarios = run_stress_test(&LimitsConfig::default(), &[], &open_book, dec!(0.1));
        let cat = &scenarios[1];
        // crypto exposure 30 * 0.1 * 2 = 6
        assert_eq!(cat.expected_loss, Usd::new(dec!(6.0)));
        assert_eq!(cat.affected_markets, vec!["m1", "m2"]);
    }

    #[test]
    fn test_regime_flip_impairs_trend_positions_only() {
        let open_book = vec![
            open("m1", "crypto", "10", Regime::TrendingUp),
            open("m2", "crypto", "10", Regime::Choppy),
        ];
        let scenarios = run_stress_test(&LimitsConfig::default(), &[], &open_book, dec!(0.1));
        let flip = &scenarios[2];
        assert_eq!(flip.expected_loss, Usd::new(dec!(3.0)));
        assert_eq!(flip.affected_markets, vec!["m1"]);
    }

    #[test]
    fn test_alert_when_loss_exceeds_daily_limit() {
        let mut config = LimitsConfig::default();
        config.base_daily_loss = Usd::new(dec!(1));
        let open_book = vec![open("m1", "crypto", "100", Regime::TrendingDown)];
        let scenarios = run_stress_test(&config, &[], &open_book, dec!(0.1));
        assert!(scenarios[2].alert);
    }

    #[test]
    fn test_empty_inputs_produce_quiet_scenarios() {
        let scenarios = run_stress_test(&LimitsConfig::default(), &[], &[], dec!(0.1));
        assert_eq!(scenarios.len(), 3);
        assert!(scenarios.iter().all(|s| !s.alert));
        assert!(scenarios.iter().all(|s| s.expected_loss.is_zero()));
    }
}
