//! Prometheus metrics and structured logging for pmx.
//!
//! - Prometheus metrics for admission decisions, breaker state, P&L
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
