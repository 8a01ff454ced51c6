//! Trade history store.
//!
//! The risk engine reads open trades (exposure checks) and recent closed
//! trades (streak multiplier, adaptive limits). The execution layer owns
//! the writes; they live here so one backend serves both sides.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use pmx_core::{ClosedTrade, OpenTrade, TradeId, Usd};

use crate::error::{StoreError, StoreResult};

/// Trade record store.
pub trait TradeStore: Send + Sync {
    /// All currently open trades.
    fn open_trades(&self) -> StoreResult<Vec<OpenTrade>>;

    /// The most recent closed trades, newest first, at most `limit`.
    fn recent_closed(&self, limit: usize) -> StoreResult<Vec<ClosedTrade>>;

    /// Closed trades settled at or after `cutoff`, newest first.
    fn closed_since(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<ClosedTrade>>;

    /// Record a newly opened trade.
    fn insert_open(&self, trade: OpenTrade) -> StoreResult<()>;

    /// Settle an open trade, moving it to the closed set.
    fn settle(&self, id: TradeId, pnl: Usd, closed_at: DateTime<Utc>) -> StoreResult<ClosedTrade>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TradeFile {
    open: Vec<OpenTrade>,
    closed: Vec<ClosedTrade>,
}

/// JSON-file trade store.
///
/// Keeps the full set in memory and rewrites the file on mutation. Fine
/// for the trade volumes of a single prediction-market account; heavier
/// deployments swap in a database-backed `TradeStore`.
pub struct JsonTradeStore {
    path: PathBuf,
    inner: RwLock<TradeFile>,
}

impl JsonTradeStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let inner = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            TradeFile::default()
        };
        debug!(
            path = %path.display(),
            open = inner.open.len(),
            closed = inner.closed.len(),
            "Trade store opened"
        );
        Ok(Self {
            path,
            inner: RwLock::new(inner),
        })
    }

    fn flush(&self, file: &TradeFile) -> StoreResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string(file)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TradeStore for JsonTradeStore {
    fn open_trades(&self) -> StoreResult<Vec<OpenTrade>> {
        Ok(self.inner.read().open.clone())
    }

    fn recent_closed(&self, limit: usize) -> StoreResult<Vec<ClosedTrade>> {
        let inner = self.inner.read();
        let mut closed: Vec<ClosedTrade> = inner.closed.clone();
        closed.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));
        closed.truncate(limit);
        Ok(closed)
    }

    fn closed_since(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<ClosedTrade>> {
        let inner = self.inner.read();
        let mut closed: Vec<ClosedTrade> = inner
            .closed
            .iter()
            .filter(|t| t.closed_at >= cutoff)
            .cloned()
            .collect();
        closed.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));
        Ok(closed)
    }

    fn insert_open(&self, trade: OpenTrade) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner.open.push(trade);
        self.flush(&inner)
    }

    fn settle(&self, id: TradeId, pnl: Usd, closed_at: DateTime<Utc>) -> StoreResult<ClosedTrade> {
        let mut inner = self.inner.write();
        let idx = inner
            .open
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("open trade {id}")))?;
        let open = inner.open.remove(idx);
        let closed = ClosedTrade {
            id: open.id,
            market_id: open.market_id,
            category: open.category,
            side: open.side,
            pnl,
            confidence: open.confidence,
            regime: open.regime,
            closed_at,
        };
        inner.closed.push(closed.clone());
        self.flush(&inner)?;
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pmx_core::Regime;
    use rust_decimal_macros::dec;

    fn open_trade(market: &str, amount: &str) -> OpenTrade {
        OpenTrade {
            id: TradeId::new(),
            market_id: market.to_string(),
            category: "crypto".to_string(),
            side: pmx_core::TradeSide::Up,
            amount: amount.parse().unwrap(),
            confidence: dec!(0.6),
            regime: Regime::Ranging,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_settle() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTradeStore::open(dir.path().join("trades.json")).unwrap();

        let trade = open_trade("btc-updown-1h", "5.00");
        let id = trade.id;
        store.insert_open(trade).unwrap();
        assert_eq!(store.open_trades().unwrap().len(), 1);

        let closed = store.settle(id, Usd::new(dec!(1.25)), Utc::now()).unwrap();
        assert_eq!(closed.pnl, Usd::new(dec!(1.25)));
        assert!(store.open_trades().unwrap().is_empty());
        assert_eq!(store.recent_closed(10).unwrap().len(), 1);
    }

    #[test]
    fn test_settle_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTradeStore::open(dir.path().join("trades.json")).unwrap();

        let err = store
            .settle(TradeId::new(), Usd::ZERO, Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_recent_closed_is_newest_first_and_capped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTradeStore::open(dir.path().join("trades.json")).unwrap();

        let base = Utc::now();
        for i in 0..5 {
            let trade = open_trade(&format!("m{i}"), "1.00");
            let id = trade.id;
            store.insert_open(trade).unwrap();
            store
                .settle(id, Usd::new(dec!(0.10)), base + Duration::minutes(i))
                .unwrap();
        }

        let recent = store.recent_closed(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].market_id, "m4");
        assert_eq!(recent[2].market_id, "m2");
    }

    #[test]
    fn test_reopen_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.json");
        {
            let store = JsonTradeStore::open(&path).unwrap();
            store.insert_open(open_trade("btc-updown-1h", "2.50")).unwrap();
        }
        let store = JsonTradeStore::open(&path).unwrap();
        assert_eq!(store.open_trades().unwrap().len(), 1);
    }
}
