use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::time::bson_datetime_as_chrono;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum XpSourceType {
    UserProblemAttempt,
    ManualAdjustment,
    SpecialAchievement,
    DailyStreak,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum XpCategory {
    CorrectAnswer,
    StreakBonus,
    Achievement,
    Manual,
}

/// One row of the append-only XP ledger. A user's total is the sum of `amount`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XpEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub source_type: XpSourceType,
    pub source_id: String,
    pub description: String,
    pub category: XpCategory,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl XpEntry {
    pub fn for_correct_answer(
        user_id: &str,
        attempt_id: &str,
        problem_id: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            source_type: XpSourceType::UserProblemAttempt,
            source_id: attempt_id.to_string(),
            description: format!("Solved problem {}", problem_id),
            category: XpCategory::CorrectAnswer,
            created_at: now,
        }
    }
}
