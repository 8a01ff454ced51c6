//! The durable admission-control authority.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use pmx_core::{BreakerTier, KellyEstimator, SignalTick, Usd};
use pmx_store::{PersistedRiskState, StateStore, TradeStore, VelocityEntry};

use crate::config::RiskConfig;
use crate::error::RiskResult;
use crate::sizing::{Sizing, SizingMethod, SizingTier};
use crate::streak::{compute_streak_multiplier, StreakMultiplier, STREAK_LOOKBACK};

/// Machine-readable admission denial reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    CircuitBreaker,
    DailyLossLimit,
    MaxPositions,
    MaxPositionsCaution,
    TotalExposureLimit,
    CategoryConcentration,
    StateUnavailable,
}

impl DenyReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CircuitBreaker => "circuit_breaker",
            Self::DailyLossLimit => "daily_loss_limit",
            Self::MaxPositions => "max_positions",
            Self::MaxPositionsCaution => "max_positions_caution",
            Self::TotalExposureLimit => "total_exposure_limit",
            Self::CategoryConcentration => "category_concentration",
            Self::StateUnavailable => "state_unavailable",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Admission decision for one candidate trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
}

impl Admission {
    #[must_use]
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    #[must_use]
    pub fn denied(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Read-only snapshot of governance state plus exposure breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskStatus {
    pub account_id: String,
    pub daily_pnl: Usd,
    pub daily_reset_date: NaiveDate,
    pub open_positions: u32,
    pub effective_max_positions: u32,
    pub circuit_broken: bool,
    pub breaker_tier: BreakerTier,
    pub velocity_window_len: usize,
    pub velocity_window_sum: Usd,
    pub recovery_mode: bool,
    pub recovery_wins: u32,
    pub total_trades: u64,
    pub total_pnl: Usd,
    pub total_exposure: Usd,
    pub exposure_by_category: BTreeMap<String, Usd>,
}

/// Rolling loss-velocity window horizon.
const VELOCITY_WINDOW_MINUTES: i64 = 30;
/// Window-sum fraction of the daily limit that forces a trip.
const VELOCITY_TRIP_FRACTION: Decimal = dec!(0.5);
/// Consecutive wins required to exit recovery mode.
const RECOVERY_EXIT_WINS: u32 = 2;
/// Smallest bet the sizer will emit.
const MIN_BET: Usd = Usd(dec!(0.1));
/// Daily loss ratio cutoffs, all exclusive.
const TIER_WARNING: Decimal = dec!(0.5);
const TIER_CAUTION: Decimal = dec!(0.75);
const TIER_TRIPPED: Decimal = dec!(1.0);

struct Inner {
    state: PersistedRiskState,
    /// Set when a persist fails. Admission is denied until a later
    /// persist succeeds, so the engine never trades on state it cannot
    /// durably record.
    store_failed: bool,
}

/// The single gate all trade proposals pass and all lifecycle events
/// report through.
///
/// All governance state lives behind one mutex so check-and-reserve is
/// a single critical section; no method suspends while holding it.
pub struct RiskManager {
    config: RiskConfig,
    state_store: Arc<dyn StateStore>,
    trade_store: Arc<dyn TradeStore>,
    estimator: Arc<dyn KellyEstimator>,
    inner: Mutex<Inner>,
}

impl RiskManager {
    /// Restore state from the store, or start fresh for a new account.
    pub fn new(
        config: RiskConfig,
        state_store: Arc<dyn StateStore>,
        trade_store: Arc<dyn TradeStore>,
        estimator: Arc<dyn KellyEstimator>,
    ) -> RiskResult<Self> {
        let state = match state_store.load()? {
            Some(state) => {
                info!(
                    account = %state.account_id,
                    daily_pnl = %state.daily_pnl,
                    open_positions = state.open_positions,
                    circuit_broken = state.circuit_broken,
                    "Restored risk state"
                );
                state
            }
            None => {
                let fresh = PersistedRiskState::fresh(&config.account_id, Utc::now().date_naive());
                info!(account = %config.account_id, "Initialized fresh risk state");
                state_store.save(&fresh)?;
                fresh
            }
        };

        Ok(Self {
            config,
            state_store,
            trade_store,
            estimator,
            inner: Mutex::new(Inner {
                state,
                store_failed: false,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Admission gate. Read-only after the day-rollover check: repeated
    /// calls with unchanged state return the same result and persist
    /// nothing.
    pub fn can_trade(&self, category: Option<&str>) -> Admission {
        let mut inner = self.inner.lock();
        self.rollover_if_needed(&mut inner, Utc::now().date_naive());
        let admission = self.check_admission(&inner, category);
        if let Some(reason) = admission.reason {
            debug!(%reason, category = category.unwrap_or("-"), "Trade denied");
        }
        admission
    }

    /// Atomic check-and-reserve: admission check plus the open-position
    /// reservation in one critical section, so concurrent proposals can
    /// never both pass the gate for the last free slot.
    pub fn reserve_entry(&self, category: Option<&str>) -> Admission {
        let mut inner = self.inner.lock();
        self.rollover_if_needed(&mut inner, Utc::now().date_naive());
        let admission = self.check_admission(&inner, category);
        if !admission.allowed {
            return admission;
        }

        inner.state.open_positions += 1;
        inner.state.total_trades += 1;
        self.persist(&mut inner);
        if inner.store_failed {
            // Roll the reservation back: the slot was never durably taken.
            inner.state.open_positions -= 1;
            inner.state.total_trades -= 1;
            return Admission::denied(DenyReason::StateUnavailable);
        }
        debug!(
            open_positions = inner.state.open_positions,
            "Entry slot reserved"
        );
        Admission::allowed()
    }

    /// Report a position opened outside `reserve_entry`.
    pub fn record_trade_open(&self) {
        let mut inner = self.inner.lock();
        self.rollover_if_needed(&mut inner, Utc::now().date_naive());
        inner.state.open_positions += 1;
        inner.state.total_trades += 1;
        self.persist(&mut inner);
        debug!(
            open_positions = inner.state.open_positions,
            total_trades = inner.state.total_trades,
            "Trade open recorded"
        );
    }

    /// Report a settled trade. Events must be applied in settle order:
    /// the velocity window and streak multiplier are order-sensitive.
    pub fn record_trade_close(&self, pnl: Usd) {
        self.record_trade_close_at(pnl, Utc::now());
    }

    /// Timestamped variant of [`record_trade_close`](Self::record_trade_close),
    /// for settlement replay and backfill.
    pub fn record_trade_close_at(&self, pnl: Usd, at: DateTime<Utc>) {
        let mut inner = self.inner.lock();
        self.rollover_if_needed(&mut inner, at.date_naive());

        let state = &mut inner.state;
        state.open_positions = state.open_positions.saturating_sub(1);
        state.daily_pnl += pnl;
        state.total_pnl += pnl;

        if pnl.is_negative() {
            state.velocity_window.push(VelocityEntry { at, loss: pnl });
        }
        let horizon = at - Duration::minutes(VELOCITY_WINDOW_MINUTES);
        state.velocity_window.retain(|e| e.at > horizon);

        self.update_breaker_tier(state);
        self.update_recovery(state, pnl);

        let daily_pnl = state.daily_pnl;
        let tier = state.breaker_tier;
        self.persist(&mut inner);
        debug!(%pnl, %daily_pnl, %tier, "Trade close recorded");
    }

    /// Manual operator override: force the breaker open.
    pub fn trip_circuit_breaker(&self, reason: &str) {
        let mut inner = self.inner.lock();
        inner.state.circuit_broken = true;
        inner.state.breaker_tier = BreakerTier::Tripped;
        self.persist(&mut inner);
        warn!(reason, "Circuit breaker tripped manually");
    }

    /// Run the day rollover if the date has changed. Idempotent; safe to
    /// call from both the scheduled task and every entry point.
    pub fn roll_day(&self) {
        let mut inner = self.inner.lock();
        self.rollover_if_needed(&mut inner, Utc::now().date_naive());
    }

    /// Current streak over the most recent closed trades.
    pub fn get_streak_multiplier(&self) -> RiskResult<StreakMultiplier> {
        let recent = self.trade_store.recent_closed(STREAK_LOOKBACK)?;
        Ok(compute_streak_multiplier(&recent))
    }

    /// Size a bet from the external Kelly estimate, streak-scaled and
    /// clamped; degrade to the naive edge-proportional size when the
    /// estimator fails or declines.
    pub fn get_kelly_bet_size(&self, tick: &SignalTick, bankroll: Usd) -> RiskResult<Sizing> {
        let streak = self.get_streak_multiplier()?;
        let max_bet = self.config.max_bet_usd;

        let estimate = self
            .estimator
            .estimate(tick.model_prob(), tick.market_price());

        let sizing = match estimate {
            Ok(est) if est.is_positive() => {
                let amount =
                    (bankroll * est.bet_pct * streak.multiplier).clamp(MIN_BET, max_bet);
                Sizing {
                    amount,
                    method: SizingMethod::Kelly,
                    kelly: Some(est),
                    sizing_tier: SizingTier::from_amount(amount, max_bet),
                    streak,
                }
            }
            Ok(est) => {
                debug!(reason = %est.reason, "Kelly estimator declined, using edge fallback");
                self.edge_fallback(tick, bankroll, streak)
            }
            Err(e) => {
                warn!(error = %e, "Kelly estimator failed, using edge fallback");
                self.edge_fallback(tick, bankroll, streak)
            }
        };
        Ok(sizing)
    }

    /// Read-only snapshot of governance state and exposure breakdown.
    pub fn get_risk_status(&self) -> RiskResult<RiskStatus> {
        let open = self.trade_store.open_trades()?;
        let total_exposure: Usd = open.iter().map(|t| t.amount).sum();
        let mut exposure_by_category: BTreeMap<String, Usd> = BTreeMap::new();
        for trade in &open {
            *exposure_by_category
                .entry(trade.category.clone())
                .or_insert(Usd::ZERO) += trade.amount;
        }

        let inner = self.inner.lock();
        let state = &inner.state;
        Ok(RiskStatus {
            account_id: state.account_id.clone(),
            daily_pnl: state.daily_pnl,
            daily_reset_date: state.daily_reset_date,
            open_positions: state.open_positions,
            effective_max_positions: self.effective_max_positions(state),
            circuit_broken: state.circuit_broken,
            breaker_tier: state.breaker_tier,
            velocity_window_len: state.velocity_window.len(),
            velocity_window_sum: state.velocity_window.iter().map(|e| e.loss).sum(),
            recovery_mode: state.recovery_mode,
            recovery_wins: state.recovery_wins,
            total_trades: state.total_trades,
            total_pnl: state.total_pnl,
            total_exposure,
            exposure_by_category,
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Ordered admission checks; first failure short-circuits.
    fn check_admission(&self, inner: &Inner, category: Option<&str>) -> Admission {
        if inner.store_failed {
            return Admission::denied(DenyReason::StateUnavailable);
        }

        let state = &inner.state;
        if state.circuit_broken {
            return Admission::denied(DenyReason::CircuitBreaker);
        }
        if state.daily_pnl <= -self.config.daily_loss_limit_usd {
            return Admission::denied(DenyReason::DailyLossLimit);
        }

        let effective_max = self.effective_max_positions(state);
        if state.open_positions >= effective_max {
            return if effective_max < self.config.max_open_positions {
                Admission::denied(DenyReason::MaxPositionsCaution)
            } else {
                Admission::denied(DenyReason::MaxPositions)
            };
        }

        let open = match self.trade_store.open_trades() {
            Ok(open) => open,
            Err(e) => {
                error!(error = %e, "Trade store unavailable during admission");
                return Admission::denied(DenyReason::StateUnavailable);
            }
        };
        let total: Usd = open.iter().map(|t| t.amount).sum();
        if total >= self.config.max_total_exposure_usd {
            return Admission::denied(DenyReason::TotalExposureLimit);
        }

        if let Some(category) = category {
            if total.is_positive() {
                let cat_exposure: Usd = open
                    .iter()
                    .filter(|t| t.category == category)
                    .map(|t| t.amount)
                    .sum();
                let cat_pct = cat_exposure.inner() / total.inner() * dec!(100);
                if cat_pct >= self.config.max_category_concentration_pct {
                    return Admission::denied(DenyReason::CategoryConcentration);
                }
            }
        }

        Admission::allowed()
    }

    /// Position cap, halved while the breaker tier is `caution`.
    fn effective_max_positions(&self, state: &PersistedRiskState) -> u32 {
        if state.breaker_tier == BreakerTier::Caution {
            (self.config.max_open_positions / 2).max(1)
        } else {
            self.config.max_open_positions
        }
    }

    /// Recompute the breaker tier from the daily loss ratio, then let
    /// the velocity window force a trip regardless of the ratio. The
    /// tier never regresses within a day.
    fn update_breaker_tier(&self, state: &mut PersistedRiskState) {
        let limit = self.config.daily_loss_limit_usd;
        let ratio = if state.daily_pnl.is_negative() {
            state.daily_pnl.abs().ratio_of(limit).unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        let ratio_tier = if ratio > TIER_TRIPPED {
            BreakerTier::Tripped
        } else if ratio > TIER_CAUTION {
            BreakerTier::Caution
        } else if ratio > TIER_WARNING {
            BreakerTier::Warning
        } else {
            BreakerTier::None
        };
        if ratio_tier > state.breaker_tier {
            state.breaker_tier = ratio_tier;
        }

        let window_sum: Usd = state.velocity_window.iter().map(|e| e.loss).sum();
        if window_sum <= -(limit * VELOCITY_TRIP_FRACTION) {
            if state.breaker_tier != BreakerTier::Tripped {
                warn!(%window_sum, "Velocity breaker tripped");
            }
            state.breaker_tier = BreakerTier::Tripped;
        }

        if state.breaker_tier == BreakerTier::Tripped && !state.circuit_broken {
            state.circuit_broken = true;
            warn!(daily_pnl = %state.daily_pnl, "Circuit breaker OPEN");
        }
    }

    /// Recovery-mode bookkeeping: two consecutive wins exit, any loss
    /// resets the counter without exiting.
    fn update_recovery(&self, state: &mut PersistedRiskState, pnl: Usd) {
        if !state.recovery_mode {
            return;
        }
        if pnl.is_positive() {
            state.recovery_wins += 1;
            if state.recovery_wins >= RECOVERY_EXIT_WINS {
                state.recovery_mode = false;
                state.recovery_wins = 0;
                info!("Recovery mode exited");
            }
        } else {
            state.recovery_wins = 0;
        }
    }

    /// Zero the daily counters exactly once per UTC day. Entering
    /// recovery mode requires the prior day to have ended tripped.
    /// Only moves forward: a backdated replay timestamp never resets.
    fn rollover_if_needed(&self, inner: &mut Inner, today: NaiveDate) {
        if today <= inner.state.daily_reset_date {
            return;
        }
        let state = &mut inner.state;
        let was_tripped = state.breaker_tier == BreakerTier::Tripped;

        info!(
            from = %state.daily_reset_date,
            to = %today,
            daily_pnl = %state.daily_pnl,
            was_tripped,
            "Daily rollover"
        );

        state.daily_pnl = Usd::ZERO;
        state.daily_reset_date = today;
        state.circuit_broken = false;
        state.breaker_tier = BreakerTier::None;
        state.velocity_window.clear();
        if was_tripped {
            state.recovery_mode = true;
            state.recovery_wins = 0;
        }
        self.persist(inner);
    }

    /// Persist the record; on failure flag the manager so admission is
    /// denied rather than trading on state the store cannot hold.
    fn persist(&self, inner: &mut Inner) {
        inner.state.updated_at = Utc::now();
        match self.state_store.save(&inner.state) {
            Ok(()) => inner.store_failed = false,
            Err(e) => {
                error!(error = %e, "Risk state persist failed");
                inner.store_failed = true;
            }
        }
    }

    fn edge_fallback(&self, tick: &SignalTick, bankroll: Usd, streak: StreakMultiplier) -> Sizing {
        let amount = (bankroll * tick.edge() * tick.confidence * streak.multiplier)
            .clamp(MIN_BET, self.config.max_bet_usd);
        Sizing {
            amount,
            method: SizingMethod::EdgeFallback,
            kelly: None,
            sizing_tier: SizingTier::from_amount(amount, self.config.max_bet_usd),
            streak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmx_core::{
        ClosedTrade, KellyEstimate, OpenTrade, Regime, SizingError, TradeId, TradeSide,
    };
    use pmx_store::{MemoryStore, StoreError, StoreResult};

    /// Estimator stub: fixed estimate or failure.
    struct StubEstimator(Option<KellyEstimate>);

    impl KellyEstimator for StubEstimator {
        fn estimate(
            &self,
            _model_prob: Decimal,
            _market_price: Decimal,
        ) -> Result<KellyEstimate, SizingError> {
            match &self.0 {
                Some(est) => Ok(est.clone()),
                None => Err(SizingError::Unavailable("stub down".to_string())),
            }
        }
    }

    /// State store whose saves always fail after construction.
    struct BrokenStateStore {
        armed: std::sync::atomic::AtomicBool,
    }

    impl BrokenStateStore {
        fn new() -> Self {
            Self {
                armed: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn arm(&self) {
            self.armed.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    impl StateStore for BrokenStateStore {
        fn load(&self) -> StoreResult<Option<PersistedRiskState>> {
            Ok(None)
        }

        fn save(&self, _state: &PersistedRiskState) -> StoreResult<()> {
            if self.armed.load(std::sync::atomic::Ordering::SeqCst) {
                Err(StoreError::NotFound("disk gone".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn config(daily_limit: &str, max_positions: u32) -> RiskConfig {
        RiskConfig {
            daily_loss_limit_usd: daily_limit.parse().unwrap(),
            max_open_positions: max_positions,
            ..RiskConfig::default()
        }
    }

    fn manager_with(config: RiskConfig, store: Arc<MemoryStore>) -> RiskManager {
        RiskManager::new(
            config,
            store.clone(),
            store,
            Arc::new(StubEstimator(Some(KellyEstimate {
                bet_pct: dec!(0.04),
                reason: "quarter_kelly".to_string(),
            }))),
        )
        .unwrap()
    }

    fn manager(daily_limit: &str, max_positions: u32) -> RiskManager {
        manager_with(config(daily_limit, max_positions), Arc::new(MemoryStore::new()))
    }

    fn usd(s: &str) -> Usd {
        s.parse().unwrap()
    }

    fn tick() -> SignalTick {
        SignalTick {
            rec: pmx_core::SignalRecommendation {
                side: TradeSide::Up,
                action: "ENTER".to_string(),
            },
            time_aware: pmx_core::TimeAwareAdjustment {
                adjusted_up: dec!(0.62),
                adjusted_down: dec!(0.38),
            },
            prices: pmx_core::SignalPrices {
                up: dec!(0.55),
                down: dec!(0.45),
            },
            confidence: dec!(0.7),
            regime: Regime::Ranging,
            market_id: "btc-updown-1h".to_string(),
            category: "crypto".to_string(),
        }
    }

    fn open_trade(category: &str, amount: &str) -> OpenTrade {
        OpenTrade {
            id: TradeId::new(),
            market_id: "m".to_string(),
            category: category.to_string(),
            side: TradeSide::Up,
            amount: usd(amount),
            confidence: dec!(0.6),
            regime: Regime::Ranging,
            opened_at: Utc::now(),
        }
    }

    /// Closes spaced wider than the velocity window, so only the daily
    /// ratio check is exercised.
    fn close_spaced(m: &RiskManager, pnls: &[&str]) {
        let start = Utc::now() - Duration::minutes(40 * pnls.len() as i64);
        for (i, pnl) in pnls.iter().enumerate() {
            m.record_trade_close_at(usd(pnl), start + Duration::minutes(40 * i as i64));
        }
    }

    #[test]
    fn test_daily_pnl_additivity() {
        let m = manager("100", 5);
        close_spaced(&m, &["1.25", "-2.50", "0.75", "-0.10"]);
        let status = m.get_risk_status().unwrap();
        assert_eq!(status.daily_pnl, usd("-0.60"));
        assert_eq!(status.total_pnl, usd("-0.60"));
    }

    #[test]
    fn test_loss_at_exact_limit_does_not_trip_ratio_breaker() {
        let m = manager("10", 5);
        close_spaced(&m, &["-4", "-4", "-2"]);
        let status = m.get_risk_status().unwrap();
        assert_eq!(status.daily_pnl, usd("-10"));
        assert!(!status.circuit_broken);
        // Ratio is exactly 1.0: caution, not tripped.
        assert_eq!(status.breaker_tier, BreakerTier::Caution);
        // The daily-loss admission check still denies at the boundary.
        let admission = m.can_trade(None);
        assert_eq!(admission.reason, Some(DenyReason::DailyLossLimit));
    }

    #[test]
    fn test_loss_past_limit_trips() {
        let m = manager("10", 5);
        close_spaced(&m, &["-4", "-4", "-2.01"]);
        let status = m.get_risk_status().unwrap();
        assert!(status.circuit_broken);
        assert_eq!(status.breaker_tier, BreakerTier::Tripped);
        assert_eq!(m.can_trade(None).reason, Some(DenyReason::CircuitBreaker));
    }

    #[test]
    fn test_velocity_trip_on_rapid_losses() {
        let m = manager("10", 5);
        let now = Utc::now();
        // -6 total inside 10 minutes: 6 >= 10 * 0.5 even though the
        // daily ratio alone (0.6) would only be warning.
        m.record_trade_close_at(usd("-2"), now - Duration::minutes(10));
        m.record_trade_close_at(usd("-2"), now - Duration::minutes(5));
        m.record_trade_close_at(usd("-2"), now);
        let status = m.get_risk_status().unwrap();
        assert!(status.circuit_broken);
        assert_eq!(status.breaker_tier, BreakerTier::Tripped);
    }

    #[test]
    fn test_velocity_window_prunes_old_losses() {
        let m = manager("10", 5);
        let now = Utc::now();
        m.record_trade_close_at(usd("-3"), now - Duration::minutes(45));
        m.record_trade_close_at(usd("-3"), now);
        let status = m.get_risk_status().unwrap();
        // Old entry pruned: window holds one loss, sum -3 > -5.
        assert_eq!(status.velocity_window_len, 1);
        assert!(!status.circuit_broken);
    }

    #[test]
    fn test_breaker_tier_warning_and_caution_bands() {
        let m = manager("10", 6);
        let now = Utc::now();
        m.record_trade_close_at(usd("-3"), now - Duration::minutes(80));
        m.record_trade_close_at(usd("-2.51"), now - Duration::minutes(40));
        // Ratio 0.551, past the 0.5 cutoff.
        assert_eq!(
            m.get_risk_status().unwrap().breaker_tier,
            BreakerTier::Warning
        );
        m.record_trade_close_at(usd("-2"), now);
        // Ratio 0.751, past the 0.75 cutoff.
        assert_eq!(
            m.get_risk_status().unwrap().breaker_tier,
            BreakerTier::Caution
        );
    }

    #[test]
    fn test_caution_halves_position_cap() {
        let store = Arc::new(MemoryStore::new());
        let m = manager_with(config("10", 6), store);
        // Drive into caution: ratio 0.8.
        close_spaced(&m, &["-4", "-4"]);
        assert_eq!(
            m.get_risk_status().unwrap().breaker_tier,
            BreakerTier::Caution
        );
        // Cap 6 halves to 3.
        m.record_trade_open();
        m.record_trade_open();
        assert!(m.can_trade(None).allowed);
        m.record_trade_open();
        assert_eq!(
            m.can_trade(None).reason,
            Some(DenyReason::MaxPositionsCaution)
        );
    }

    #[test]
    fn test_max_positions_end_to_end() {
        let m = manager("100", 3);
        m.record_trade_open();
        m.record_trade_open();
        m.record_trade_open();
        assert_eq!(m.can_trade(None).reason, Some(DenyReason::MaxPositions));

        m.record_trade_close(usd("0.50"));
        assert!(m.can_trade(None).allowed);
    }

    #[test]
    fn test_reserve_entry_admits_exactly_capacity() {
        let m = manager("100", 3);
        assert!(m.reserve_entry(None).allowed);
        assert!(m.reserve_entry(None).allowed);
        assert!(m.reserve_entry(None).allowed);
        let fourth = m.reserve_entry(None);
        assert_eq!(fourth.reason, Some(DenyReason::MaxPositions));
        assert_eq!(m.get_risk_status().unwrap().open_positions, 3);
    }

    #[test]
    fn test_total_exposure_limit() {
        let store = Arc::new(MemoryStore::new());
        store.seed_open(vec![open_trade("crypto", "60"), open_trade("sports", "40")]);
        let m = manager_with(config("100", 10), store);
        assert_eq!(
            m.can_trade(None).reason,
            Some(DenyReason::TotalExposureLimit)
        );
    }

    #[test]
    fn test_category_concentration() {
        let store = Arc::new(MemoryStore::new());
        store.seed_open(vec![open_trade("crypto", "40"), open_trade("sports", "10")]);
        let m = manager_with(config("100", 10), store);
        // crypto is 80% of exposure, above the 60% default cap.
        assert_eq!(
            m.can_trade(Some("crypto")).reason,
            Some(DenyReason::CategoryConcentration)
        );
        // A diversifying category is fine.
        assert!(m.can_trade(Some("politics")).allowed);
    }

    #[test]
    fn test_can_trade_is_pure_read() {
        let store = Arc::new(MemoryStore::new());
        let m = manager_with(config("100", 5), store.clone());
        let before = pmx_store::StateStore::load(store.as_ref()).unwrap();

        let first = m.can_trade(Some("crypto"));
        let second = m.can_trade(Some("crypto"));
        assert_eq!(first, second);

        let after = pmx_store::StateStore::load(store.as_ref()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_rollover_enters_recovery_only_after_tripped_day() {
        let store = Arc::new(MemoryStore::new());
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        let mut state = PersistedRiskState::fresh("default", yesterday);
        state.daily_pnl = usd("-12");
        state.circuit_broken = true;
        state.breaker_tier = BreakerTier::Tripped;
        pmx_store::StateStore::save(store.as_ref(), &state).unwrap();

        let m = manager_with(config("10", 5), store);
        assert!(m.can_trade(None).allowed);
        let status = m.get_risk_status().unwrap();
        assert_eq!(status.daily_pnl, Usd::ZERO);
        assert!(!status.circuit_broken);
        assert!(status.recovery_mode);
        assert_eq!(status.recovery_wins, 0);
    }

    #[test]
    fn test_rollover_without_trip_skips_recovery() {
        let store = Arc::new(MemoryStore::new());
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        let mut state = PersistedRiskState::fresh("default", yesterday);
        state.daily_pnl = usd("-6");
        state.breaker_tier = BreakerTier::Warning;
        pmx_store::StateStore::save(store.as_ref(), &state).unwrap();

        let m = manager_with(config("10", 5), store);
        m.roll_day();
        assert!(!m.get_risk_status().unwrap().recovery_mode);
    }

    #[test]
    fn test_recovery_exits_after_two_consecutive_wins() {
        let store = Arc::new(MemoryStore::new());
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        let mut state = PersistedRiskState::fresh("default", yesterday);
        state.breaker_tier = BreakerTier::Tripped;
        pmx_store::StateStore::save(store.as_ref(), &state).unwrap();

        let m = manager_with(config("10", 5), store);
        m.roll_day();
        assert!(m.get_risk_status().unwrap().recovery_mode);

        m.record_trade_close(usd("1"));
        let status = m.get_risk_status().unwrap();
        assert!(status.recovery_mode);
        assert_eq!(status.recovery_wins, 1);

        m.record_trade_close(usd("1"));
        assert!(!m.get_risk_status().unwrap().recovery_mode);
    }

    #[test]
    fn test_loss_resets_recovery_wins_without_exiting() {
        let store = Arc::new(MemoryStore::new());
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        let mut state = PersistedRiskState::fresh("default", yesterday);
        state.breaker_tier = BreakerTier::Tripped;
        pmx_store::StateStore::save(store.as_ref(), &state).unwrap();

        let m = manager_with(config("100", 5), store);
        m.roll_day();
        m.record_trade_close(usd("1"));
        m.record_trade_close(usd("-0.50"));
        let status = m.get_risk_status().unwrap();
        assert!(status.recovery_mode);
        assert_eq!(status.recovery_wins, 0);

        m.record_trade_close(usd("1"));
        m.record_trade_close(usd("1"));
        assert!(!m.get_risk_status().unwrap().recovery_mode);
    }

    #[test]
    fn test_manual_trip() {
        let m = manager("100", 5);
        assert!(m.can_trade(None).allowed);
        m.trip_circuit_breaker("operator halt");
        assert_eq!(m.can_trade(None).reason, Some(DenyReason::CircuitBreaker));
    }

    #[test]
    fn test_persist_failure_denies_state_unavailable() {
        let broken = Arc::new(BrokenStateStore::new());
        let trades = Arc::new(MemoryStore::new());
        let m = RiskManager::new(
            config("100", 5),
            broken.clone(),
            trades,
            Arc::new(StubEstimator(None)),
        )
        .unwrap();

        assert!(m.can_trade(None).allowed);
        broken.arm();
        m.record_trade_close(usd("-1"));
        assert_eq!(
            m.can_trade(None).reason,
            Some(DenyReason::StateUnavailable)
        );
    }

    #[test]
    fn test_kelly_sizing_happy_path() {
        let m = manager("100", 5);
        let sizing = m.get_kelly_bet_size(&tick(), usd("500")).unwrap();
        assert_eq!(sizing.method, SizingMethod::Kelly);
        // 500 * 0.04 * 1.0 = 20, below the 25 max bet.
        assert_eq!(sizing.amount, usd("20.00"));
        assert_eq!(sizing.sizing_tier, SizingTier::Aggressive);
        assert!(sizing.kelly.is_some());
    }

    #[test]
    fn test_kelly_sizing_clamped_to_max_bet() {
        let m = manager("100", 5);
        let sizing = m.get_kelly_bet_size(&tick(), usd("10000")).unwrap();
        assert_eq!(sizing.amount, m.config().max_bet_usd);
    }

    #[test]
    fn test_estimator_failure_degrades_to_edge_fallback() {
        let store = Arc::new(MemoryStore::new());
        let m = RiskManager::new(
            config("100", 5),
            store.clone(),
            store,
            Arc::new(StubEstimator(None)),
        )
        .unwrap();

        let sizing = m.get_kelly_bet_size(&tick(), usd("100")).unwrap();
        assert_eq!(sizing.method, SizingMethod::EdgeFallback);
        assert!(sizing.kelly.is_none());
        // edge 0.07 * confidence 0.7 * 100 = 4.90
        assert_eq!(sizing.amount, usd("4.9000"));
    }

    #[test]
    fn test_declined_estimate_also_falls_back() {
        let store = Arc::new(MemoryStore::new());
        let m = RiskManager::new(
            config("100", 5),
            store.clone(),
            store,
            Arc::new(StubEstimator(Some(KellyEstimate {
                bet_pct: dec!(0),
                reason: "edge_below_min".to_string(),
            }))),
        )
        .unwrap();
        let sizing = m.get_kelly_bet_size(&tick(), usd("100")).unwrap();
        assert_eq!(sizing.method, SizingMethod::EdgeFallback);
    }

    #[test]
    fn test_loss_streak_scales_bet_down() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store.seed_closed(
            (0..5)
                .map(|i| ClosedTrade {
                    id: TradeId::new(),
                    market_id: "m".to_string(),
                    category: "crypto".to_string(),
                    side: TradeSide::Up,
                    pnl: usd("-1"),
                    confidence: dec!(0.6),
                    regime: Regime::Ranging,
                    closed_at: now - Duration::minutes(i),
                })
                .collect(),
        );
        let m = manager_with(config("100", 5), store);

        let streak = m.get_streak_multiplier().unwrap();
        assert_eq!(streak.multiplier, dec!(0.25));

        let sizing = m.get_kelly_bet_size(&tick(), usd("500")).unwrap();
        // 500 * 0.04 * 0.25 = 5
        assert_eq!(sizing.amount, usd("5.00"));
    }

    #[test]
    fn test_open_positions_never_underflow() {
        let m = manager("100", 5);
        m.record_trade_close(usd("1"));
        assert_eq!(m.get_risk_status().unwrap().open_positions, 0);
    }
}
