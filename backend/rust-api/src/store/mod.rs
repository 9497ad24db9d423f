//! Persistence boundary of the progression engine.
//!
//! Reads go straight through [`ProgressStore`]. Everything a submission writes
//! goes through a [`SubmissionTx`]: nothing is visible to other readers until
//! [`SubmissionTx::commit`] returns, and dropping the transaction discards it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    Attempt, Lesson, Problem, Streak, SubmissionOutcome, SubmissionRecord, XpEntry,
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryProgressStore;
pub use mongo::MongoProgressStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another transaction touched the same rows first. Safe to retry.
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error("storage backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    /// Lessons ordered by `order`.
    async fn list_lessons(&self) -> StoreResult<Vec<Lesson>>;
    async fn find_lesson(&self, lesson_id: &str) -> StoreResult<Option<Lesson>>;
    /// Problems of a lesson ordered by `order`.
    async fn list_problems(&self, lesson_id: &str) -> StoreResult<Vec<Problem>>;
    async fn list_all_problems(&self) -> StoreResult<Vec<Problem>>;
    async fn find_problem(&self, problem_id: &str) -> StoreResult<Option<Problem>>;

    async fn list_attempts(&self, user_id: &str) -> StoreResult<Vec<Attempt>>;
    async fn has_attempt_since(&self, user_id: &str, since: DateTime<Utc>) -> StoreResult<bool>;
    async fn find_streak(&self, user_id: &str) -> StoreResult<Option<Streak>>;
    /// Sum of the XP ledger for `user_id`.
    async fn sum_xp(&self, user_id: &str) -> StoreResult<i64>;

    /// Opens the unit of work for one submission on (user, problem). Two open
    /// transactions on the same pair never interleave.
    async fn begin_submission(
        &self,
        user_id: &str,
        problem_id: &str,
    ) -> StoreResult<Box<dyn SubmissionTx>>;
}

#[async_trait]
pub trait SubmissionTx: Send {
    /// Outcome stored when `attempt_id` was first applied to this pair.
    async fn recorded_outcome(
        &mut self,
        attempt_id: &str,
    ) -> StoreResult<Option<SubmissionOutcome>>;
    async fn attempt(&mut self) -> StoreResult<Option<Attempt>>;
    async fn streak(&mut self) -> StoreResult<Option<Streak>>;

    async fn upsert_attempt(&mut self, attempt: &Attempt) -> StoreResult<()>;
    async fn append_xp(&mut self, entry: &XpEntry) -> StoreResult<()>;
    async fn upsert_streak(&mut self, streak: &Streak) -> StoreResult<()>;
    async fn record_submission(&mut self, record: &SubmissionRecord) -> StoreResult<()>;

    /// Re-sums the ledger (including writes staged in this transaction) and
    /// refreshes the cached per-user total. Returns the sum.
    async fn refresh_total_xp(&mut self, now: DateTime<Utc>) -> StoreResult<i64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
