//! In-memory store for tests and ephemeral runs.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use pmx_core::{ClosedTrade, OpenTrade, TradeId, Usd};

use crate::error::{StoreError, StoreResult};
use crate::state::{PersistedRiskState, StateStore};
use crate::trades::TradeStore;

/// In-memory implementation of both store traits.
///
/// State survives for the lifetime of the process only. Used by unit
/// tests and by `--ephemeral` runs where durability is explicitly waived.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<Option<PersistedRiskState>>,
    open: RwLock<Vec<OpenTrade>>,
    closed: RwLock<Vec<ClosedTrade>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed closed-trade history, newest last.
    pub fn seed_closed(&self, trades: Vec<ClosedTrade>) {
        *self.closed.write() = trades;
    }

    /// Seed open trades.
    pub fn seed_open(&self, trades: Vec<OpenTrade>) {
        *self.open.write() = trades;
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> StoreResult<Option<PersistedRiskState>> {
        Ok(self.state.read().clone())
    }

    fn save(&self, state: &PersistedRiskState) -> StoreResult<()> {
        *self.state.write() = Some(state.clone());
        Ok(())
    }
}

impl TradeStore for MemoryStore {
    fn open_trades(&self) -> StoreResult<Vec<OpenTrade>> {
        Ok(self.open.read().clone())
    }

    fn recent_closed(&self, limit: usize) -> StoreResult<Vec<ClosedTrade>> {
        let mut closed = self.closed.read().clone();
        closed.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));
        closed.truncate(limit);
        Ok(closed)
    }

    fn closed_since(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<ClosedTrade>> {
        let mut closed: Vec<ClosedTrade> = self
            .closed
            .read()
            .iter()
            .filter(|t| t.closed_at >= cutoff)
            .cloned()
            .collect();
        closed.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));
        Ok(closed)
    }

    fn insert_open(&self, trade: OpenTrade) -> StoreResult<()> {
        self.open.write().push(trade);
        Ok(())
    }

    fn settle(&self, id: TradeId, pnl: Usd, closed_at: DateTime<Utc>) -> StoreResult<ClosedTrade> {
        let mut open = self.open.write();
        let idx = open
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("open trade {id}")))?;
        let t = open.remove(idx);
        let closed = ClosedTrade {
            id: t.id,
            market_id: t.market_id,
            category: t.category,
            side: t.side,
            pnl,
            confidence: t.confidence,
            regime: t.regime,
            closed_at,
        };
        self.closed.write().push(closed.clone());
        Ok(closed)
    }
}
