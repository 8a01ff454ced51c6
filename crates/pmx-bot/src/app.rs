//! Application wiring and run loop.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, warn};

use pmx_breaker::{BreakerContext, BreakerEvaluation, BreakerStatus, PredictiveBreaker};
use pmx_core::{BreakerTier, ClosedTrade, OpenTrade, SignalTick, TradeId, Usd};
use pmx_limits::position_limits::adaptive_position_limits;
use pmx_limits::AdaptiveLimits;
use pmx_risk::{spawn_daily_reset, Admission, RiskManager, RiskStatus, Sizing};
use pmx_store::{JsonStateStore, JsonTradeStore, MemoryStore, StateStore, TradeStore};
use pmx_telemetry::Metrics;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::kelly::FractionalKelly;

/// Closed-trade window fed to the adaptive limiter.
const LIMITS_LOOKBACK: usize = 50;

/// The assembled governor.
///
/// Every governance call goes through here so admission decisions,
/// sizing outcomes and breaker evaluations all land in the metrics.
pub struct Application {
    config: AppConfig,
    manager: Arc<RiskManager>,
    breaker: Arc<PredictiveBreaker>,
    trade_store: Arc<dyn TradeStore>,
}

impl Application {
    /// Wire stores, risk manager and breaker from config.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let (state_store, trade_store): (Arc<dyn StateStore>, Arc<dyn TradeStore>) =
            if config.store.ephemeral {
                warn!("Ephemeral store: state will not survive a restart");
                let mem = Arc::new(MemoryStore::new());
                (mem.clone(), mem)
            } else {
                let dir = Path::new(&config.store.data_dir);
                let state = JsonStateStore::new(dir.join("risk_state.json"));
                let trades = JsonTradeStore::open(dir.join("trades.json"))?;
                (Arc::new(state), Arc::new(trades))
            };

        let estimator = Arc::new(FractionalKelly::new(config.limits.base_kelly_fraction));
        let manager = Arc::new(RiskManager::new(
            config.risk.clone(),
            state_store,
            trade_store.clone(),
            estimator,
        )?);
        let breaker = Arc::new(PredictiveBreaker::new(config.limits.base_daily_loss));

        Ok(Self {
            config,
            manager,
            breaker,
            trade_store,
        })
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<RiskManager> {
        &self.manager
    }

    #[must_use]
    pub fn breaker(&self) -> &Arc<PredictiveBreaker> {
        &self.breaker
    }

    /// Read-only admission check.
    pub fn admit(&self, category: Option<&str>) -> Admission {
        let admission = self.manager.can_trade(category);
        Metrics::admission(admission.reason.map(|r| r.as_str()));
        admission
    }

    /// Atomic check-and-reserve for one entry slot.
    pub fn reserve(&self, category: Option<&str>) -> Admission {
        let admission = self.manager.reserve_entry(category);
        Metrics::admission(admission.reason.map(|r| r.as_str()));
        admission
    }

    /// Record a filled entry against a slot reserved via [`reserve`](Self::reserve).
    pub fn open_trade(&self, trade: OpenTrade) -> AppResult<()> {
        self.trade_store.insert_open(trade)?;
        self.refresh_gauges()?;
        Ok(())
    }

    /// Settle an open trade and feed the result through the risk manager.
    pub fn settle_trade(&self, id: TradeId, pnl: Usd) -> AppResult<ClosedTrade> {
        let closed = self.trade_store.settle(id, pnl, Utc::now())?;
        self.manager.record_trade_close(pnl);

        let outcome = if pnl.is_positive() {
            "win"
        } else if pnl.is_negative() {
            "loss"
        } else {
            "flat"
        };
        Metrics::trade_closed(outcome);
        self.refresh_gauges()?;
        Ok(closed)
    }

    /// Size a bet for a signal tick against the configured bankroll.
    pub fn size_bet(&self, tick: &SignalTick) -> AppResult<Sizing> {
        tick.validate()?;
        let sizing = self
            .manager
            .get_kelly_bet_size(tick, self.config.bankroll_usd)?;
        Metrics::bet_sized(
            sizing.method.as_str(),
            sizing.amount.inner().to_f64().unwrap_or(0.0),
        );
        Ok(sizing)
    }

    /// Evaluate the predictive breaker and mirror the result into metrics.
    pub fn evaluate_breaker(&self, ctx: &BreakerContext) -> BreakerEvaluation {
        let previous = self.breaker.last_evaluation().map(|e| e.status);
        let evaluation = self.breaker.evaluate(ctx);

        Metrics::breaker_status(match evaluation.status {
            BreakerStatus::Normal => 0,
            BreakerStatus::Cautious => 1,
            BreakerStatus::Halted => 2,
        });
        if evaluation.status == BreakerStatus::Halted && previous != Some(BreakerStatus::Halted) {
            Metrics::breaker_tripped("predictive");
        }
        evaluation
    }

    /// Current position limits scaled to recent performance.
    pub fn adaptive_limits(&self) -> AppResult<AdaptiveLimits> {
        let recent = self.trade_store.recent_closed(LIMITS_LOOKBACK)?;
        Ok(adaptive_position_limits(&self.config.limits, &recent))
    }

    /// Full governance snapshot.
    pub fn risk_status(&self) -> AppResult<RiskStatus> {
        Ok(self.manager.get_risk_status()?)
    }

    fn refresh_gauges(&self) -> AppResult<()> {
        let status = self.manager.get_risk_status()?;
        Metrics::daily_pnl(status.daily_pnl.inner().to_f64().unwrap_or(0.0));
        Metrics::open_positions(i64::from(status.open_positions));
        Metrics::breaker_tier(match status.breaker_tier {
            BreakerTier::None => 0,
            BreakerTier::Warning => 1,
            BreakerTier::Caution => 2,
            BreakerTier::Tripped => 3,
        });
        Metrics::recovery_mode(status.recovery_mode);
        Ok(())
    }

    fn log_status(&self) -> AppResult<()> {
        let status = self.manager.get_risk_status()?;
        info!(
            daily_pnl = %status.daily_pnl,
            open_positions = status.open_positions,
            effective_max = status.effective_max_positions,
            tier = %status.breaker_tier,
            circuit_broken = status.circuit_broken,
            recovery_mode = status.recovery_mode,
            total_exposure = %status.total_exposure,
            total_trades = status.total_trades,
            "Risk status"
        );
        self.refresh_gauges()
    }

    /// Run the governor: daily-reset task, periodic status log, ctrl-c
    /// shutdown. The trading surface is the library API; this loop only
    /// keeps the governance state observable and the rollover on time.
    pub async fn run(self) -> AppResult<()> {
        info!(account = %self.config.risk.account_id, "Starting governor");

        let reset_handle = spawn_daily_reset(self.manager.clone());
        let mut status_interval =
            tokio::time::interval(Duration::from_secs(self.config.telemetry.status_interval_secs));

        loop {
            tokio::select! {
                _ = status_interval.tick() => {
                    if let Err(e) = self.log_status() {
                        warn!(error = %e, "Status snapshot failed");
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        reset_handle.abort();
        self.log_status()?;
        Ok(())
    }
}
