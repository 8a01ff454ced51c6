//! Prometheus metrics for the pmx governor.
//!
//! Covers:
//! - Admission decisions and denial reasons
//! - Circuit breaker trips and tier
//! - Daily P&L and open positions
//! - Bet sizing outcomes
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, register_int_counter,
    register_int_gauge, CounterVec, Gauge, Histogram, IntCounter, IntGauge,
};

/// Total admissions denied by reason.
/// Labels: reason (circuit_breaker/daily_loss_limit/max_positions/
/// max_positions_caution/total_exposure_limit/category_concentration/
/// state_unavailable)
pub static ADMISSION_DENIED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pmx_admission_denied_total",
        "Total trade admissions denied",
        &["reason"]
    )
    .unwrap()
});

/// Total admissions allowed.
pub static ADMISSION_ALLOWED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("pmx_admission_allowed_total", "Total trade admissions allowed").unwrap()
});

/// Total circuit breaker trips by source.
/// Labels: source (daily_loss/velocity/manual/predictive)
pub static BREAKER_TRIPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pmx_breaker_trips_total",
        "Total circuit breaker trips",
        &["source"]
    )
    .unwrap()
});

/// Current breaker tier (0=none, 1=warning, 2=caution, 3=tripped).
pub static BREAKER_TIER: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pmx_breaker_tier",
        "Current breaker tier (0=none, 1=warning, 2=caution, 3=tripped)"
    )
    .unwrap()
});

/// Predictive breaker status (0=normal, 1=cautious, 2=halted).
pub static BREAKER_STATUS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pmx_breaker_status",
        "Predictive breaker status (0=normal, 1=cautious, 2=halted)"
    )
    .unwrap()
});

/// Realized P&L since the last daily reset, in USD.
pub static DAILY_PNL_USD: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("pmx_daily_pnl_usd", "Realized P&L since last daily reset (USD)").unwrap()
});

/// Current open position count.
pub static OPEN_POSITIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("pmx_open_positions", "Current open position count").unwrap()
});

/// Total trade closes by outcome.
/// Labels: outcome (win/loss/flat)
pub static TRADE_CLOSES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pmx_trade_closes_total",
        "Total trade closes",
        &["outcome"]
    )
    .unwrap()
});

/// Bet size distribution in USD.
pub static BET_SIZE_USD: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "pmx_bet_size_usd",
        "Bet size distribution (USD)",
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 20.0, 25.0, 50.0]
    )
    .unwrap()
});

/// Total bets sized by method.
/// Labels: method (kelly/edge_fallback)
pub static SIZING_METHOD_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pmx_sizing_method_total",
        "Total bets sized by method",
        &["method"]
    )
    .unwrap()
});

/// Total daily rollovers executed.
pub static DAILY_ROLLOVERS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("pmx_daily_rollovers_total", "Total daily rollovers executed").unwrap()
});

/// Recovery mode state (1=active, 0=inactive).
pub static RECOVERY_MODE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("pmx_recovery_mode", "Recovery mode state (1=active)").unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record an admission decision.
    pub fn admission(reason: Option<&str>) {
        match reason {
            Some(reason) => {
                ADMISSION_DENIED_TOTAL.with_label_values(&[reason]).inc();
            }
            None => ADMISSION_ALLOWED_TOTAL.inc(),
        }
    }

    /// Record a circuit breaker trip.
    pub fn breaker_tripped(source: &str) {
        BREAKER_TRIPS_TOTAL.with_label_values(&[source]).inc();
    }

    /// Update the breaker tier gauge.
    pub fn breaker_tier(tier: i64) {
        BREAKER_TIER.set(tier);
    }

    /// Update the predictive breaker status gauge.
    pub fn breaker_status(status: i64) {
        BREAKER_STATUS.set(status);
    }

    /// Update the daily P&L gauge.
    pub fn daily_pnl(pnl_usd: f64) {
        DAILY_PNL_USD.set(pnl_usd);
    }

    /// Update the open position count.
    pub fn open_positions(count: i64) {
        OPEN_POSITIONS.set(count);
    }

    /// Record a trade close.
    pub fn trade_closed(outcome: &str) {
        TRADE_CLOSES_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record a sized bet.
    pub fn bet_sized(method: &str, amount_usd: f64) {
        SIZING_METHOD_TOTAL.with_label_values(&[method]).inc();
        BET_SIZE_USD.observe(amount_usd);
    }

    /// Record a daily rollover.
    pub fn daily_rollover() {
        DAILY_ROLLOVERS_TOTAL.inc();
    }

    /// Update the recovery mode gauge.
    pub fn recovery_mode(active: bool) {
        RECOVERY_MODE.set(if active { 1 } else { 0 });
    }
}
