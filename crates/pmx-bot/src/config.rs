//! Application configuration.

use crate::error::{AppError, AppResult};
use pmx_core::Usd;
use pmx_limits::LimitsConfig;
use pmx_risk::RiskConfig;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Durable store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the state and trade JSON files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Keep all state in memory; durability is explicitly waived.
    #[serde(default)]
    pub ephemeral: bool,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ephemeral: false,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Risk status log interval in seconds.
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
}

fn default_status_interval_secs() -> u64 {
    300
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            status_interval_secs: default_status_interval_secs(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bankroll used for bet sizing (USD).
    #[serde(default = "default_bankroll_usd")]
    pub bankroll_usd: Usd,
    /// Admission-control limits.
    #[serde(default)]
    pub risk: RiskConfig,
    /// Adaptive limit bases.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_bankroll_usd() -> Usd {
    Usd::new(dec!(500))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bankroll_usd: default_bankroll_usd(),
            risk: RiskConfig::default(),
            limits: LimitsConfig::default(),
            telemetry: TelemetryConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("PMX_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }
}
