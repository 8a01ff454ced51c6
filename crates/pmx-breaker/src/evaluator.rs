//! Breaker evaluation over live forecast context.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use pmx_core::{Regime, Usd};
use pmx_limits::RegimeThresholds;

/// Live inputs to one breaker evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakerContext {
    pub regime: Regime,
    /// Forecast probability of breaching the loss limit within 4 hours,
    /// from the external Monte-Carlo forecaster.
    pub breach_prob_4h: Decimal,
    /// Current volatility percentile in `[0, 100]`.
    pub vol_percentile: Decimal,
    pub unrealized_pnl: Usd,
    pub realized_pnl_today: Usd,
}

/// Severity of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// What condition fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    DailyLoss,
    BreachProbability,
    Volatility,
    UnrealizedDrawdown,
    CombinedDrawdown,
}

/// One fired trigger with the observed value and the threshold it crossed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub severity: Severity,
    pub value: Decimal,
    pub threshold: Decimal,
}

/// Recommended mitigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BreakerAction {
    HaltTrading,
    HaltAndTrim,
    BlockNewEntries,
    TrimPositions { trim_pct: Decimal },
    ReduceSize { multiplier: Decimal },
}

impl BreakerAction {
    /// True for actions that stop all trading.
    #[must_use]
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::HaltTrading | Self::HaltAndTrim)
    }

    /// True for actions that veto new entries without halting exits.
    #[must_use]
    pub fn blocks_new_entries(&self) -> bool {
        matches!(self, Self::BlockNewEntries)
    }
}

/// An action with its originating reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAction {
    #[serde(flatten)]
    pub action: BreakerAction,
    pub reason: String,
}

/// Overall breaker status derived from the actions and triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakerStatus {
    Normal,
    Cautious,
    Halted,
}

/// Derived measurements exposed for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakerMetrics {
    /// Regime-scaled daily loss limit used by every check.
    pub daily_loss_limit: Usd,
    /// Realized plus negative unrealized P&L.
    pub combined_pnl: Usd,
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerEvaluation {
    pub regime: Regime,
    pub thresholds: RegimeThresholds,
    pub status: BreakerStatus,
    pub can_trade: bool,
    pub can_open_new: bool,
    pub triggers: Vec<Trigger>,
    pub actions: Vec<RecommendedAction>,
    pub metrics: BreakerMetrics,
}

/// Breach probability above which escalation is critical regardless of
/// the regime-relative gate. The gate itself is regime-relative; this
/// absolute cutoff is intentional and must not be normalized.
const BREACH_PROB_CRITICAL: Decimal = dec!(0.6);
/// Unrealized drawdown trigger point, as a fraction of the daily limit.
const UNREALIZED_TRIGGER_FRAC: Decimal = dec!(0.6);
/// Combined (realized + negative unrealized) trigger point.
const COMBINED_TRIGGER_FRAC: Decimal = dec!(0.8);
const TRIM_PCT: Decimal = dec!(30);
const REDUCE_SIZE_MULT: Decimal = dec!(0.5);

/// Stateless breaker evaluator.
///
/// Retains only the last evaluation for inspection.
pub struct PredictiveBreaker {
    base_daily_loss: Usd,
    last_evaluation: RwLock<Option<BreakerEvaluation>>,
}

impl PredictiveBreaker {
    #[must_use]
    pub fn new(base_daily_loss: Usd) -> Self {
        Self {
            base_daily_loss,
            last_evaluation: RwLock::new(None),
        }
    }

    /// The most recent evaluation, if any.
    #[must_use]
    pub fn last_evaluation(&self) -> Option<BreakerEvaluation> {
        self.last_evaluation.read().clone()
    }

    /// Run the five trigger checks and derive a status.
    pub fn evaluate(&self, ctx: &BreakerContext) -> BreakerEvaluation {
        let thresholds = RegimeThresholds::for_regime(ctx.regime);
        let limit = thresholds.daily_loss_limit(self.base_daily_loss);

        let mut triggers = Vec::new();
        let mut actions = Vec::new();

        // 1. Realized daily loss beyond the regime-scaled limit.
        if ctx.realized_pnl_today < -limit {
            triggers.push(Trigger {
                kind: TriggerKind::DailyLoss,
                severity: Severity::Critical,
                value: ctx.realized_pnl_today.inner(),
                threshold: (-limit).inner(),
            });
            actions.push(RecommendedAction {
                action: BreakerAction::HaltTrading,
                reason: format!("realized {} below limit {}", ctx.realized_pnl_today, -limit),
            });
        }

        // 2. Forecast breach probability. The gate is regime-relative;
        //    the critical escalation is on an absolute 0.6 scale.
        if ctx.breach_prob_4h > thresholds.breach_prob_halt {
            if ctx.breach_prob_4h > BREACH_PROB_CRITICAL {
                triggers.push(Trigger {
                    kind: TriggerKind::BreachProbability,
                    severity: Severity::Critical,
                    value: ctx.breach_prob_4h,
                    threshold: BREACH_PROB_CRITICAL,
                });
                actions.push(RecommendedAction {
                    action: BreakerAction::HaltAndTrim,
                    reason: format!("breach probability {} critical", ctx.breach_prob_4h),
                });
            } else {
                triggers.push(Trigger {
                    kind: TriggerKind::BreachProbability,
                    severity: Severity::Warning,
                    value: ctx.breach_prob_4h,
                    threshold: thresholds.breach_prob_halt,
                });
                actions.push(RecommendedAction {
                    action: BreakerAction::BlockNewEntries,
                    reason: format!(
                        "breach probability {} above {} gate",
                        ctx.breach_prob_4h, thresholds.breach_prob_halt
                    ),
                });
            }
        }

        // 3. Volatility percentile above the regime gate.
        if ctx.vol_percentile > thresholds.vol_gate_pct {
            triggers.push(Trigger {
                kind: TriggerKind::Volatility,
                severity: Severity::Warning,
                value: ctx.vol_percentile,
                threshold: thresholds.vol_gate_pct,
            });
            actions.push(RecommendedAction {
                action: BreakerAction::BlockNewEntries,
                reason: format!(
                    "volatility {}pct above {}pct gate",
                    ctx.vol_percentile, thresholds.vol_gate_pct
                ),
            });
        }

        // 4. Unrealized drawdown.
        let unrealized_trigger = -(limit * UNREALIZED_TRIGGER_FRAC);
        if ctx.unrealized_pnl < unrealized_trigger {
            let severity = if ctx.unrealized_pnl < -limit {
                Severity::Critical
            } else {
                Severity::Warning
            };
            triggers.push(Trigger {
                kind: TriggerKind::UnrealizedDrawdown,
                severity,
                value: ctx.unrealized_pnl.inner(),
                threshold: unrealized_trigger.inner(),
            });
            actions.push(RecommendedAction {
                action: BreakerAction::TrimPositions { trim_pct: TRIM_PCT },
                reason: format!("unrealized {} below {}", ctx.unrealized_pnl, unrealized_trigger),
            });
        }

        // 5. Combined realized + negative unrealized.
        let combined = ctx.realized_pnl_today + ctx.unrealized_pnl.min(Usd::ZERO);
        let combined_trigger = -(limit * COMBINED_TRIGGER_FRAC);
        if combined < combined_trigger {
            triggers.push(Trigger {
                kind: TriggerKind::CombinedDrawdown,
                severity: Severity::Warning,
                value: combined.inner(),
                threshold: combined_trigger.inner(),
            });
            actions.push(RecommendedAction {
                action: BreakerAction::ReduceSize {
                    multiplier: REDUCE_SIZE_MULT,
                },
                reason: format!("combined {} below {}", combined, combined_trigger),
            });
        }

        let status = derive_status(&triggers, &actions);
        let evaluation = BreakerEvaluation {
            regime: ctx.regime,
            thresholds,
            status,
            can_trade: status != BreakerStatus::Halted,
            can_open_new: status == BreakerStatus::Normal,
            triggers,
            actions,
            metrics: BreakerMetrics {
                daily_loss_limit: limit,
                combined_pnl: combined,
            },
        };

        match status {
            BreakerStatus::Normal => debug!(regime = %ctx.regime, "Breaker normal"),
            BreakerStatus::Cautious => warn!(
                regime = %ctx.regime,
                triggers = evaluation.triggers.len(),
                "Breaker cautious"
            ),
            BreakerStatus::Halted => warn!(
                regime = %ctx.regime,
                triggers = evaluation.triggers.len(),
                "Breaker HALTED"
            ),
        }

        *self.last_evaluation.write() = Some(evaluation.clone());
        evaluation
    }
}

fn derive_status(triggers: &[Trigger], actions: &[RecommendedAction]) -> BreakerStatus {
    if actions.iter().any(|a| a.action.is_halt()) {
        return BreakerStatus::Halted;
    }
    let any_block = actions.iter().any(|a| a.action.blocks_new_entries());
    let any_warning = triggers.iter().any(|t| t.severity == Severity::Warning);
    if any_block || any_warning {
        BreakerStatus::Cautious
    } else {
        BreakerStatus::Normal
    }
}
