use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::time::bson_datetime_as_chrono;

/// XP granted the first time a problem is solved.
pub const XP_PER_CORRECT_ANSWER: i64 = 10;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 128, message = "problemId must be 1-128 characters"))]
    pub problem_id: String,

    #[validate(length(min = 1, max = 128, message = "attemptId must be 1-128 characters"))]
    pub attempt_id: String,

    #[validate(length(max = 1024, message = "answer must be at most 1024 characters"))]
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeMessage {
    Correct,
    Incorrect,
    AlreadyCorrect,
}

impl OutcomeMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeMessage::Correct => "Correct! +10 XP",
            OutcomeMessage::Incorrect => "Incorrect answer",
            OutcomeMessage::AlreadyCorrect => "Already answered correctly",
        }
    }
}

/// Result of one submission. Stored per attempt id so a replay returns it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub xp_awarded: i64,
    pub total_xp: i64,
    pub streak: u32,
    pub longest_streak: u32,
    pub message: String,
    pub is_correct: bool,
    pub was_newly_correct: bool,
}

/// Latest known state of one (user, problem) pair. Upserted, never appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub problem_id: String,
    pub last_submission_id: String,
    pub submitted_answer: String,
    pub is_correct: bool,
    pub xp_earned: i64,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
    pub last_outcome: SubmissionOutcome,
}

/// Every applied attempt id on a (user, problem) pair keeps its outcome, so a
/// token replayed after newer submissions still gets its own answer back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionRecord {
    pub user_id: String,
    pub problem_id: String,
    pub attempt_id: String,
    pub outcome: SubmissionOutcome,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemAttemptView {
    pub is_correct: bool,
    pub attempted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempted: Option<DateTime<Utc>>,
}

impl ProblemAttemptView {
    pub fn not_attempted() -> Self {
        Self {
            is_correct: false,
            attempted: false,
            last_attempted: None,
        }
    }
}

impl From<&Attempt> for ProblemAttemptView {
    fn from(attempt: &Attempt) -> Self {
        Self {
            is_correct: attempt.is_correct,
            attempted: true,
            last_attempted: Some(attempt.updated_at),
        }
    }
}
