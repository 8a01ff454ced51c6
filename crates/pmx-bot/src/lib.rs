//! pmx prediction-market execution governor.
//!
//! Main application that wires the engine together:
//! - Durable state and trade stores
//! - RiskManager admission gate
//! - Predictive breaker
//! - Telemetry (metrics + structured logging)
//! - Scheduled daily reset

pub mod app;
pub mod config;
pub mod error;
pub mod kelly;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use kelly::FractionalKelly;
