//! Daily streak transitions.
//!
//! Runs once per applied submission. `newly_correct` is true only for the first
//! correct answer to a problem, so re-solving a problem never extends a streak.

use chrono::NaiveDate;

use crate::models::Streak;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("last active date {last_active} is after today ({today})")]
pub struct ClockSkew {
    pub last_active: NaiveDate,
    pub today: NaiveDate,
}

pub fn next_streak(
    current: Option<&Streak>,
    today: NaiveDate,
    newly_correct: bool,
) -> Result<Streak, ClockSkew> {
    let Some(prior) = current else {
        let initial = u32::from(newly_correct);
        return Ok(Streak {
            current_streak: initial,
            longest_streak: initial,
            last_active_date: today,
        });
    };

    let diff_days = (today - prior.last_active_date).num_days();
    if diff_days < 0 {
        return Err(ClockSkew {
            last_active: prior.last_active_date,
            today,
        });
    }

    let current_streak = match (newly_correct, diff_days) {
        (true, 1) => prior.current_streak.saturating_add(1),
        (true, 0) if prior.current_streak == 0 => 1,
        (true, 0) => prior.current_streak,
        (true, _) => 1,
        (false, d) if d > 1 => 0,
        (false, _) => prior.current_streak,
    };

    Ok(Streak {
        current_streak,
        longest_streak: current_streak.max(prior.longest_streak),
        last_active_date: today,
    })
}
