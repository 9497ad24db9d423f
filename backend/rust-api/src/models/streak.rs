use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily streak of one user. `last_active_date` is a UTC calendar day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Streak {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StreakView {
    pub current: u32,
    pub longest: u32,
}

impl From<Option<Streak>> for StreakView {
    fn from(streak: Option<Streak>) -> Self {
        streak
            .map(|s| StreakView {
                current: s.current_streak,
                longest: s.longest_streak,
            })
            .unwrap_or_default()
    }
}
