//! Win/loss streak multiplier.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use pmx_core::ClosedTrade;

/// Direction of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakDirection {
    Win,
    Loss,
    Flat,
}

/// Current same-direction run over the most recent closed trades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreakMultiplier {
    pub streak: u32,
    pub direction: StreakDirection,
    pub multiplier: Decimal,
}

impl StreakMultiplier {
    const NEUTRAL: Self = Self {
        streak: 0,
        direction: StreakDirection::Flat,
        multiplier: Decimal::ONE,
    };
}

/// How many closed trades the streak inspects.
pub const STREAK_LOOKBACK: usize = 10;

const WIN_MULT_CAP: Decimal = dec!(1.2);
const WIN_MULT_STEP: Decimal = dec!(0.05);

/// Count the current same-direction run over `recent` (newest first,
/// at most [`STREAK_LOOKBACK`] entries considered) and map it to a bet
/// multiplier.
///
/// Loss streaks cut size hard (>=5 quarters it, >=3 halves it); win
/// streaks scale up linearly to a 1.2x cap. Break-even closes end the
/// run.
#[must_use]
pub fn compute_streak_multiplier(recent: &[ClosedTrade]) -> StreakMultiplier {
    let mut iter = recent.iter().take(STREAK_LOOKBACK);
    let first = match iter.next() {
        Some(t) => t,
        None => return StreakMultiplier::NEUTRAL,
    };
    if first.pnl.is_zero() {
        return StreakMultiplier::NEUTRAL;
    }

    let winning = first.is_win();
    let mut streak: u32 = 1;
    for trade in iter {
        if trade.pnl.is_zero() || trade.is_win() != winning {
            break;
        }
        streak += 1;
    }

    if winning {
        let multiplier = if streak >= 3 {
            (Decimal::ONE + WIN_MULT_STEP * Decimal::from(streak)).min(WIN_MULT_CAP)
        } else {
            Decimal::ONE
        };
        StreakMultiplier {
            streak,
            direction: StreakDirection::Win,
            multiplier,
        }
    } else {
        let multiplier = if streak >= 5 {
            dec!(0.25)
        } else if streak >= 3 {
            dec!(0.5)
        } else {
            Decimal::ONE
        };
        StreakMultiplier {
            streak,
            direction: StreakDirection::Loss,
            multiplier,
        }
    }
}
