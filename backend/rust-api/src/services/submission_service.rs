use std::sync::Arc;

use uuid::Uuid;

use crate::errors::{ProgressError, ProgressResult};
use crate::metrics::{
    record_answer, SUBMISSION_CONFLICTS_TOTAL, SUBMISSION_REPLAYS_TOTAL, XP_AWARDED_TOTAL,
};
use crate::models::answer::{OutcomeMessage, XP_PER_CORRECT_ANSWER};
use crate::models::{
    Attempt, Problem, SubmissionOutcome, SubmissionRecord, SubmitAnswerRequest, XpEntry,
};
use crate::store::{ProgressStore, StoreError};
use crate::utils::retry::{retry_async_if, RetryConfig};
use crate::utils::time::Clock;

use super::grading::is_answer_correct;
use super::streak_engine::next_streak;

enum Applied {
    Replayed(SubmissionOutcome),
    Committed(SubmissionOutcome),
}

pub struct SubmissionService {
    store: Arc<dyn ProgressStore>,
    clock: Arc<dyn Clock>,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn ProgressStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Grades one answer and applies its effects in a single transaction.
    ///
    /// Re-sending any `attempt_id` already applied to the same problem returns
    /// the outcome stored for it without writing anything, even after newer
    /// submissions.
    pub async fn submit(
        &self,
        user_id: &str,
        lesson_id: &str,
        req: &SubmitAnswerRequest,
    ) -> ProgressResult<SubmissionOutcome> {
        tracing::info!(
            user_id,
            lesson_id,
            problem_id = %req.problem_id,
            attempt_id = %req.attempt_id,
            "Processing answer submission"
        );

        let problem = self
            .store
            .find_problem(&req.problem_id)
            .await?
            .filter(|problem| problem.lesson_id == lesson_id)
            .ok_or_else(|| {
                ProgressError::not_found(format!(
                    "Problem {} not found in lesson {}",
                    req.problem_id, lesson_id
                ))
            })?;

        let applied = retry_async_if(
            RetryConfig::conflict(),
            |err: &ProgressError| {
                if err.is_conflict() {
                    SUBMISSION_CONFLICTS_TOTAL.inc();
                    tracing::debug!("Submission conflict, retrying: {}", err);
                    true
                } else {
                    false
                }
            },
            || self.apply_once(user_id, &problem, &req.attempt_id, &req.answer),
        )
        .await
        .map_err(|err| match err {
            ProgressError::Conflict(reason) => {
                tracing::error!("Submission still conflicting after retries: {}", reason);
                ProgressError::Persistence(StoreError::Conflict(reason))
            }
            ProgressError::ClockSkew(skew) => {
                tracing::error!(user_id, "Refusing streak update: {}", skew);
                ProgressError::ClockSkew(skew)
            }
            other => other,
        })?;

        match applied {
            Applied::Replayed(outcome) => {
                SUBMISSION_REPLAYS_TOTAL.inc();
                tracing::info!(
                    user_id,
                    attempt_id = %req.attempt_id,
                    "Returning stored outcome for repeated submission"
                );
                Ok(outcome)
            }
            Applied::Committed(outcome) => {
                record_answer(outcome.is_correct);
                if outcome.xp_awarded > 0 {
                    XP_AWARDED_TOTAL.inc_by(outcome.xp_awarded as u64);
                }
                tracing::info!(
                    user_id,
                    problem_id = %problem.id,
                    correct = outcome.is_correct,
                    newly_correct = outcome.was_newly_correct,
                    total_xp = outcome.total_xp,
                    streak = outcome.streak,
                    "Submission applied"
                );
                Ok(outcome)
            }
        }
    }

    async fn apply_once(
        &self,
        user_id: &str,
        problem: &Problem,
        attempt_id: &str,
        answer: &str,
    ) -> ProgressResult<Applied> {
        let mut tx = self.store.begin_submission(user_id, &problem.id).await?;

        if let Some(outcome) = tx.recorded_outcome(attempt_id).await? {
            return Ok(Applied::Replayed(outcome));
        }

        let existing = tx.attempt().await?;

        let now = self.clock.now();
        let is_correct = is_answer_correct(answer, &problem.canonical_answer);
        let already_correct = existing.as_ref().is_some_and(|attempt| attempt.is_correct);
        let was_newly_correct = is_correct && !already_correct;

        let row_id = existing
            .as_ref()
            .map(|attempt| attempt.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if was_newly_correct {
            let entry = XpEntry::for_correct_answer(
                user_id,
                &row_id,
                &problem.id,
                XP_PER_CORRECT_ANSWER,
                now,
            );
            tx.append_xp(&entry).await?;
        }

        let prior_streak = tx.streak().await?;
        let streak = next_streak(prior_streak.as_ref(), now.date_naive(), was_newly_correct)?;
        tx.upsert_streak(&streak).await?;

        let total_xp = tx.refresh_total_xp(now).await?;

        let message = if was_newly_correct {
            OutcomeMessage::Correct
        } else if is_correct {
            OutcomeMessage::AlreadyCorrect
        } else {
            OutcomeMessage::Incorrect
        };

        let outcome = SubmissionOutcome {
            xp_awarded: if was_newly_correct {
                XP_PER_CORRECT_ANSWER
            } else {
                0
            },
            total_xp,
            streak: streak.current_streak,
            longest_streak: streak.longest_streak,
            message: message.as_str().to_string(),
            is_correct,
            was_newly_correct,
        };

        let attempt = match existing {
            Some(mut attempt) => {
                attempt.last_submission_id = attempt_id.to_string();
                attempt.submitted_answer = answer.to_string();
                attempt.updated_at = now;
                if was_newly_correct {
                    attempt.is_correct = true;
                    attempt.xp_earned = XP_PER_CORRECT_ANSWER;
                }
                attempt.last_outcome = outcome.clone();
                attempt
            }
            None => Attempt {
                id: row_id,
                user_id: user_id.to_string(),
                problem_id: problem.id.clone(),
                last_submission_id: attempt_id.to_string(),
                submitted_answer: answer.to_string(),
                is_correct,
                xp_earned: if is_correct { XP_PER_CORRECT_ANSWER } else { 0 },
                created_at: now,
                updated_at: now,
                last_outcome: outcome.clone(),
            },
        };
        tx.upsert_attempt(&attempt).await?;
        tx.record_submission(&SubmissionRecord {
            user_id: user_id.to_string(),
            problem_id: problem.id.clone(),
            attempt_id: attempt_id.to_string(),
            outcome: outcome.clone(),
            created_at: now,
        })
        .await?;

        tx.commit().await?;
        Ok(Applied::Committed(outcome))
    }
}
