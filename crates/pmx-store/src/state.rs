//! The single durable risk-governance record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use pmx_core::{BreakerTier, Usd};

use crate::error::StoreResult;

/// One entry of the rolling loss-velocity window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityEntry {
    pub at: DateTime<Utc>,
    /// Loss amount, stored negative.
    pub loss: Usd,
}

/// The durable risk state record: exactly one logical instance per account.
///
/// Created once at process start (or restored), mutated only through the
/// trade lifecycle events and the daily rollover; never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRiskState {
    pub account_id: String,
    /// Realized P&L since the last daily reset.
    pub daily_pnl: Usd,
    /// Last UTC date a daily reset occurred.
    pub daily_reset_date: NaiveDate,
    pub open_positions: u32,
    /// True once the daily-loss or velocity limit is breached.
    pub circuit_broken: bool,
    pub breaker_tier: BreakerTier,
    /// Losing closes younger than the velocity horizon.
    pub velocity_window: Vec<VelocityEntry>,
    pub recovery_mode: bool,
    /// Consecutive winning closes while in recovery mode.
    pub recovery_wins: u32,
    pub total_trades: u64,
    /// Lifetime P&L; the only counter allowed to go negative.
    pub total_pnl: Usd,
    pub updated_at: DateTime<Utc>,
}

impl PersistedRiskState {
    /// Fresh state for a new account, dated today.
    #[must_use]
    pub fn fresh(account_id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            account_id: account_id.into(),
            daily_pnl: Usd::ZERO,
            daily_reset_date: today,
            open_positions: 0,
            circuit_broken: false,
            breaker_tier: BreakerTier::None,
            velocity_window: Vec::new(),
            recovery_mode: false,
            recovery_wins: 0,
            total_trades: 0,
            total_pnl: Usd::ZERO,
            updated_at: Utc::now(),
        }
    }
}

/// Durable store for the risk-governance record.
pub trait StateStore: Send + Sync {
    /// Load the record, or `None` if the account has no state yet.
    fn load(&self) -> StoreResult<Option<PersistedRiskState>>;

    /// Persist the record, replacing any prior version.
    fn save(&self, state: &PersistedRiskState) -> StoreResult<()>;
}

/// JSON-file state store.
///
/// Writes go through a temp file and an atomic rename so a crash
/// mid-write never leaves a torn record.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> StoreResult<Option<PersistedRiskState>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No risk state file, starting fresh");
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let state: PersistedRiskState = serde_json::from_str(&content)?;
        debug!(
            account = %state.account_id,
            reset_date = %state.daily_reset_date,
            "Restored risk state"
        );
        Ok(Some(state))
    }

    fn save(&self, state: &PersistedRiskState) -> StoreResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&tmp, content)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            warn!(error = %e, path = %self.path.display(), "State rename failed");
            return Err(e.into());
        }
        Ok(())
    }
}
