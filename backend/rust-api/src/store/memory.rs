//! Process-local backend for development and tests.
//!
//! Submissions on one (user, problem) pair are serialized by a per-pair mutex
//! held for the whole transaction. The mutex is dropped from the lock table
//! once no transaction holds or waits for it. Writes are staged and applied in
//! one step on commit. The per-user streak row is versioned, so two
//! transactions on different problems of the same user cannot both overwrite
//! it: the later commit fails with [`StoreError::Conflict`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{ProgressStore, StoreError, StoreResult, SubmissionTx};
use crate::models::{
    content::Catalog, Attempt, Lesson, Problem, Streak, SubmissionOutcome, SubmissionRecord,
    XpEntry,
};

type PairKey = (String, String);
/// (user, problem, attempt id)
type SubmissionKey = (String, String, String);
type PairLocks = Arc<std::sync::Mutex<HashMap<PairKey, Arc<Mutex<()>>>>>;

#[derive(Debug, Clone)]
struct Versioned<T> {
    version: u64,
    value: T,
}

#[derive(Debug, Default)]
struct MemoryState {
    lessons: HashMap<String, Lesson>,
    problems: HashMap<String, Problem>,
    attempts: HashMap<PairKey, Attempt>,
    submissions: HashMap<SubmissionKey, SubmissionRecord>,
    xp_ledger: Vec<XpEntry>,
    streaks: HashMap<String, Versioned<Streak>>,
    xp_totals: HashMap<String, i64>,
}

impl MemoryState {
    fn from_catalog(catalog: Catalog) -> Self {
        Self {
            lessons: catalog
                .lessons
                .into_iter()
                .map(|lesson| (lesson.id.clone(), lesson))
                .collect(),
            problems: catalog
                .problems
                .into_iter()
                .map(|problem| (problem.id.clone(), problem))
                .collect(),
            ..Self::default()
        }
    }

    fn ledger_sum(&self, user_id: &str) -> i64 {
        self.xp_ledger
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.amount)
            .sum()
    }

    fn streak_version(&self, user_id: &str) -> u64 {
        self.streaks.get(user_id).map_or(0, |row| row.version)
    }
}

#[derive(Clone, Default)]
pub struct MemoryProgressStore {
    state: Arc<RwLock<MemoryState>>,
    pair_locks: PairLocks,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::from_catalog(catalog))),
            pair_locks: Arc::default(),
        }
    }

    /// Loads lessons and problems from a JSON file shaped like [`Catalog`].
    pub fn from_catalog_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let catalog: Catalog = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;

        tracing::info!(
            "Loaded catalog {}: {} lessons, {} problems",
            path.display(),
            catalog.lessons.len(),
            catalog.problems.len()
        );
        Ok(Self::with_catalog(catalog))
    }

    /// Ledger rows of one user in insertion order.
    pub async fn xp_entries(&self, user_id: &str) -> Vec<XpEntry> {
        let state = self.state.read().await;
        state
            .xp_ledger
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn cached_total_xp(&self, user_id: &str) -> Option<i64> {
        self.state.read().await.xp_totals.get(user_id).copied()
    }

    /// Overwrites a streak row outside of any submission. Seeding only.
    pub async fn put_streak(&self, user_id: &str, streak: Streak) {
        let mut state = self.state.write().await;
        let version = state.streak_version(user_id) + 1;
        state.streaks.insert(
            user_id.to_string(),
            Versioned {
                version,
                value: streak,
            },
        );
    }

    fn pair_lock(&self, key: &PairKey) -> Arc<Mutex<()>> {
        let mut locks = self
            .pair_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.clone()).or_default().clone()
    }

    #[cfg(test)]
    fn tracked_pair_locks(&self) -> usize {
        self.pair_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Holds the pair mutex for one transaction. On drop it releases the mutex
/// and removes the table entry if nobody else holds a handle to it.
struct PairGuard {
    locks: PairLocks,
    key: PairKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairGuard {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let lock = OwnedMutexGuard::mutex(&guard).clone();
        drop(guard);

        // Handles are cloned out of the table under this lock, so a count of
        // two (table + `lock`) means no waiter exists.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn list_lessons(&self) -> StoreResult<Vec<Lesson>> {
        let state = self.state.read().await;
        let mut lessons: Vec<Lesson> = state.lessons.values().cloned().collect();
        lessons.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(lessons)
    }

    async fn find_lesson(&self, lesson_id: &str) -> StoreResult<Option<Lesson>> {
        Ok(self.state.read().await.lessons.get(lesson_id).cloned())
    }

    async fn list_problems(&self, lesson_id: &str) -> StoreResult<Vec<Problem>> {
        let state = self.state.read().await;
        let mut problems: Vec<Problem> = state
            .problems
            .values()
            .filter(|problem| problem.lesson_id == lesson_id)
            .cloned()
            .collect();
        problems.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(problems)
    }

    async fn list_all_problems(&self) -> StoreResult<Vec<Problem>> {
        Ok(self.state.read().await.problems.values().cloned().collect())
    }

    async fn find_problem(&self, problem_id: &str) -> StoreResult<Option<Problem>> {
        Ok(self.state.read().await.problems.get(problem_id).cloned())
    }

    async fn list_attempts(&self, user_id: &str) -> StoreResult<Vec<Attempt>> {
        let state = self.state.read().await;
        Ok(state
            .attempts
            .values()
            .filter(|attempt| attempt.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn has_attempt_since(&self, user_id: &str, since: DateTime<Utc>) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .attempts
            .values()
            .any(|attempt| attempt.user_id == user_id && attempt.updated_at >= since))
    }

    async fn find_streak(&self, user_id: &str) -> StoreResult<Option<Streak>> {
        let state = self.state.read().await;
        Ok(state.streaks.get(user_id).map(|row| row.value))
    }

    async fn sum_xp(&self, user_id: &str) -> StoreResult<i64> {
        Ok(self.state.read().await.ledger_sum(user_id))
    }

    async fn begin_submission(
        &self,
        user_id: &str,
        problem_id: &str,
    ) -> StoreResult<Box<dyn SubmissionTx>> {
        let key = (user_id.to_string(), problem_id.to_string());
        let guard = self.pair_lock(&key).lock_owned().await;

        Ok(Box::new(MemorySubmissionTx {
            state: self.state.clone(),
            _pair_guard: PairGuard {
                locks: self.pair_locks.clone(),
                key: key.clone(),
                guard: Some(guard),
            },
            key,
            observed_streak_version: None,
            staged_submission: None,
            staged_attempt: None,
            staged_xp: Vec::new(),
            staged_streak: None,
            refresh_total_at: None,
        }))
    }
}

struct MemorySubmissionTx {
    state: Arc<RwLock<MemoryState>>,
    _pair_guard: PairGuard,
    key: PairKey,
    observed_streak_version: Option<u64>,
    staged_submission: Option<SubmissionRecord>,
    staged_attempt: Option<Attempt>,
    staged_xp: Vec<XpEntry>,
    staged_streak: Option<Streak>,
    refresh_total_at: Option<DateTime<Utc>>,
}

impl MemorySubmissionTx {
    fn user_id(&self) -> &str {
        &self.key.0
    }

    fn submission_key(&self, attempt_id: &str) -> SubmissionKey {
        (self.key.0.clone(), self.key.1.clone(), attempt_id.to_string())
    }
}

#[async_trait]
impl SubmissionTx for MemorySubmissionTx {
    async fn recorded_outcome(
        &mut self,
        attempt_id: &str,
    ) -> StoreResult<Option<SubmissionOutcome>> {
        if let Some(staged) = self
            .staged_submission
            .as_ref()
            .filter(|record| record.attempt_id == attempt_id)
        {
            return Ok(Some(staged.outcome.clone()));
        }
        let key = self.submission_key(attempt_id);
        let state = self.state.read().await;
        Ok(state.submissions.get(&key).map(|record| record.outcome.clone()))
    }

    async fn attempt(&mut self) -> StoreResult<Option<Attempt>> {
        if let Some(staged) = &self.staged_attempt {
            return Ok(Some(staged.clone()));
        }
        Ok(self.state.read().await.attempts.get(&self.key).cloned())
    }

    async fn streak(&mut self) -> StoreResult<Option<Streak>> {
        let state = self.state.read().await;
        let row = state.streaks.get(&self.key.0);
        self.observed_streak_version = Some(row.map_or(0, |row| row.version));
        Ok(self.staged_streak.or(row.map(|row| row.value)))
    }

    async fn upsert_attempt(&mut self, attempt: &Attempt) -> StoreResult<()> {
        self.staged_attempt = Some(attempt.clone());
        Ok(())
    }

    async fn append_xp(&mut self, entry: &XpEntry) -> StoreResult<()> {
        self.staged_xp.push(entry.clone());
        Ok(())
    }

    async fn upsert_streak(&mut self, streak: &Streak) -> StoreResult<()> {
        if self.observed_streak_version.is_none() {
            let version = self.state.read().await.streak_version(self.user_id());
            self.observed_streak_version = Some(version);
        }
        self.staged_streak = Some(*streak);
        Ok(())
    }

    async fn record_submission(&mut self, record: &SubmissionRecord) -> StoreResult<()> {
        self.staged_submission = Some(record.clone());
        Ok(())
    }

    async fn refresh_total_xp(&mut self, now: DateTime<Utc>) -> StoreResult<i64> {
        let committed = self.state.read().await.ledger_sum(self.user_id());
        let staged: i64 = self.staged_xp.iter().map(|entry| entry.amount).sum();
        self.refresh_total_at = Some(now);
        Ok(committed + staged)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let tx = *self;
        let mut state = tx.state.write().await;
        let user_id = tx.key.0.clone();

        if tx.staged_streak.is_some() {
            let current = state.streak_version(&user_id);
            let observed = tx.observed_streak_version.unwrap_or(current);
            if current != observed {
                return Err(StoreError::Conflict(format!(
                    "streak of {} changed during submission (version {} -> {})",
                    user_id, observed, current
                )));
            }
        }

        if let Some(attempt) = tx.staged_attempt {
            state.attempts.insert(tx.key.clone(), attempt);
        }
        if let Some(record) = tx.staged_submission {
            let key = (
                record.user_id.clone(),
                record.problem_id.clone(),
                record.attempt_id.clone(),
            );
            state.submissions.insert(key, record);
        }
        state.xp_ledger.extend(tx.staged_xp);
        if let Some(streak) = tx.staged_streak {
            let version = state.streak_version(&user_id) + 1;
            state.streaks.insert(
                user_id.clone(),
                Versioned {
                    version,
                    value: streak,
                },
            );
        }
        if tx.refresh_total_at.is_some() {
            let total = state.ledger_sum(&user_id);
            state.xp_totals.insert(user_id, total);
        }

        Ok(())
    }
}
