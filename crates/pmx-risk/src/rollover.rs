//! Scheduled daily reset.
//!
//! The rollover itself is lazy: every `RiskManager` entry point checks
//! the date first, so a missed tick can never skip a reset. This task
//! only makes the reset prompt when the engine is idle over midnight.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::manager::RiskManager;

/// Spawn a task that runs the day rollover just after each UTC midnight.
pub fn spawn_daily_reset(manager: Arc<RiskManager>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = until_next_midnight();
            info!(secs = wait.as_secs(), "Daily reset scheduled");
            tokio::time::sleep(wait).await;
            manager.roll_day();
        }
    })
}

/// Duration until the next UTC midnight, with a small grace offset so
/// the tick lands strictly inside the new day.
fn until_next_midnight() -> std::time::Duration {
    let now = Utc::now();
    let next = (now.date_naive() + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc() + Duration::seconds(1));
    match next {
        Some(next) => (next - now)
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(60)),
        None => {
            warn!("Could not compute next midnight, retrying in an hour");
            std::time::Duration::from_secs(3600)
        }
    }
}
