//! Risk manager configuration.
//!
//! All limits are runtime-adjustable via the config file, not
//! compile-time constants.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use pmx_core::Usd;

/// Admission-control limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Account identifier for the durable state record.
    #[serde(default = "default_account_id")]
    pub account_id: String,
    /// Maximum single bet (USD).
    #[serde(default = "default_max_bet_usd")]
    pub max_bet_usd: Usd,
    /// Daily realized loss limit (USD). Crossing it trips the breaker.
    #[serde(default = "default_daily_loss_limit_usd")]
    pub daily_loss_limit_usd: Usd,
    /// Maximum concurrent open positions.
    #[serde(default = "default_max_open_positions")]
    pub max_open_positions: u32,
    /// Maximum share of total exposure in one category, in percent.
    #[serde(default = "default_max_category_concentration_pct")]
    pub max_category_concentration_pct: Decimal,
    /// Maximum total open exposure (USD).
    #[serde(default = "default_max_total_exposure_usd")]
    pub max_total_exposure_usd: Usd,
}

fn default_account_id() -> String {
    "default".to_string()
}

fn default_max_bet_usd() -> Usd {
    Usd::new(dec!(25))
}

fn default_daily_loss_limit_usd() -> Usd {
    Usd::new(dec!(50))
}

fn default_max_open_positions() -> u32 {
    5
}

fn default_max_category_concentration_pct() -> Decimal {
    dec!(60)
}

fn default_max_total_exposure_usd() -> Usd {
    Usd::new(dec!(100))
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            account_id: default_account_id(),
            max_bet_usd: default_max_bet_usd(),
            daily_loss_limit_usd: default_daily_loss_limit_usd(),
            max_open_positions: default_max_open_positions(),
            max_category_concentration_pct: default_max_category_concentration_pct(),
            max_total_exposure_usd: default_max_total_exposure_usd(),
        }
    }
}
