//! Durable state and trade record store for pmx.
//!
//! The persistence technology is deliberately abstract: the risk engine
//! talks to two narrow traits (`StateStore` for the single governance
//! record, `TradeStore` for trade history reads) and never to a concrete
//! backend. Ships a JSON-file implementation for single-process
//! deployments and an in-memory implementation for tests.

pub mod error;
pub mod memory;
pub mod state;
pub mod trades;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use state::{JsonStateStore, PersistedRiskState, StateStore, VelocityEntry};
pub use trades::{JsonTradeStore, TradeStore};
