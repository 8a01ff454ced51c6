//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Core(#[from] pmx_core::CoreError),

    #[error("Risk error: {0}")]
    Risk(#[from] pmx_risk::RiskError),

    #[error("Store error: {0}")]
    Store(#[from] pmx_store::StoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] pmx_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
