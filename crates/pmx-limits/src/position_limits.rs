//! Regime- and performance-scaled position limits.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pmx_core::{ClosedTrade, Regime, Usd};

use crate::thresholds::{LimitsConfig, RegimeThresholds};

/// Account-wide limits after regime scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalLimits {
    pub max_daily_loss: Usd,
    pub max_drawdown_pct: Decimal,
    pub max_open_positions: u32,
    pub kelly_fraction: Decimal,
}

/// Per-market cap after performance tiering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerMarketLimit {
    pub market_id: String,
    /// Maximum position as percent of bankroll, capped at the config ceiling.
    pub max_position_pct: Decimal,
    pub max_daily_loss: Usd,
    pub cap_multiplier: Decimal,
}

/// Full adaptive limit set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveLimits {
    pub dominant_regime: Regime,
    pub global: GlobalLimits,
    pub per_market: Vec<PerMarketLimit>,
}

struct MarketPerf {
    trades: u32,
    wins: u32,
    pnl_sum: Usd,
}

impl MarketPerf {
    fn win_rate(&self) -> Decimal {
        if self.trades == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.wins) / Decimal::from(self.trades)
    }

    fn avg_pnl(&self) -> Usd {
        if self.trades == 0 {
            return Usd::ZERO;
        }
        self.pnl_sum / Decimal::from(self.trades)
    }
}

/// Derive the dominant regime from recent trade volume.
///
/// Falls back to `Ranging` when there is no history to vote with.
#[must_use]
pub fn dominant_regime(recent: &[ClosedTrade]) -> Regime {
    let mut votes: HashMap<Regime, u32> = HashMap::new();
    for trade in recent {
        *votes.entry(trade.regime).or_insert(0) += 1;
    }
    votes
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(regime, _)| regime)
        .unwrap_or(Regime::Ranging)
}

/// Compute regime-scaled global limits and performance-tiered per-market
/// caps from recent closed trades.
#[must_use]
pub fn adaptive_position_limits(config: &LimitsConfig, recent: &[ClosedTrade]) -> AdaptiveLimits {
    let regime = dominant_regime(recent);
    let thresholds = RegimeThresholds::for_regime(regime);

    let scaled_positions =
        (Decimal::from(config.base_max_open_positions) * thresholds.kelly_multiplier)
            .floor()
            .max(Decimal::ONE);
    let global = GlobalLimits {
        max_daily_loss: thresholds.daily_loss_limit(config.base_daily_loss),
        max_drawdown_pct: config.base_max_drawdown_pct * thresholds.daily_loss_limit_mult,
        max_open_positions: scaled_positions
            .to_u32()
            .unwrap_or(config.base_max_open_positions),
        kelly_fraction: config.base_kelly_fraction * thresholds.kelly_multiplier,
    };

    let mut perf: HashMap<String, MarketPerf> = HashMap::new();
    for trade in recent {
        let entry = perf.entry(trade.market_id.clone()).or_insert(MarketPerf {
            trades: 0,
            wins: 0,
            pnl_sum: Usd::ZERO,
        });
        entry.trades += 1;
        if trade.is_win() {
            entry.wins += 1;
        }
        entry.pnl_sum += trade.pnl;
    }

    let mut per_market: Vec<PerMarketLimit> = perf
        .into_iter()
        .map(|(market_id, p)| {
            let cap_multiplier = market_cap_multiplier(&p);
            let max_position_pct =
                (config.base_position_pct * cap_multiplier).min(config.position_pct_cap);
            PerMarketLimit {
                market_id,
                max_position_pct,
                max_daily_loss: config.per_market_daily_loss * cap_multiplier,
                cap_multiplier,
            }
        })
        .collect();
    per_market.sort_by(|a, b| a.market_id.cmp(&b.market_id));

    debug!(
        regime = %regime,
        markets = per_market.len(),
        max_daily_loss = %global.max_daily_loss,
        "Adaptive position limits"
    );

    AdaptiveLimits {
        dominant_regime: regime,
        global,
        per_market,
    }
}

/// Performance tier for one market.
///
/// Outperforming markets earn a wider cap; bleeding or coin-flip markets
/// get squeezed.
fn market_cap_multiplier(perf: &MarketPerf) -> Decimal {
    let win_rate = perf.win_rate();
    let avg_pnl = perf.avg_pnl();

    if win_rate > dec!(0.6) && avg_pnl.is_positive() {
        dec!(1.3)
    } else if win_rate < dec!(0.4) {
        dec!(0.5)
    } else if avg_pnl.is_negative() {
        dec!(0.7)
    } else {
        dec!(1.0)
    }
}
