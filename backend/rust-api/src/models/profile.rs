use serde::Serialize;

use super::streak::StreakView;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    pub xp_into_level: i64,
    pub xp_for_next_level: i64,
    pub progress_percentage: f64,
    pub total_xp_for_current_level: i64,
    pub total_xp_for_next_level: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "totalXP")]
    pub total_xp: i64,
    pub progress: f64,
    pub streak: StreakView,
    pub has_activity_today: bool,
    pub level: u32,
    pub xp_into_level: i64,
    pub xp_for_next_level: i64,
    pub level_progress: f64,
}
