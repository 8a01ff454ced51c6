//! Risk error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Store error: {0}")]
    Store(#[from] pmx_store::StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type RiskResult<T> = Result<T, RiskError>;
