use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::IndexOptions,
    Client, ClientSession, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use super::{ProgressStore, StoreError, StoreResult, SubmissionTx};
use crate::metrics::track_db_operation;
use crate::models::{
    Attempt, Lesson, Problem, Streak, SubmissionOutcome, SubmissionRecord, XpEntry,
};
use crate::utils::time::chrono_to_bson;

/// Collection names as constants.
pub mod collections {
    pub const LESSONS: &str = "lessons";
    pub const PROBLEMS: &str = "problems";
    pub const ATTEMPTS: &str = "attempts";
    /// One row per applied (user, problem, attempt id) with its outcome.
    pub const SUBMISSIONS: &str = "submissions";
    pub const XP_LEDGER: &str = "xp_ledger";
    pub const STREAKS: &str = "streaks";
    /// Denormalized XP totals (keyed by user id). Cache only.
    pub const USER_PROFILES: &str = "user_profiles";
}

const DUPLICATE_KEY: i32 = 11000;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        let duplicate_key = matches!(
            *err.kind,
            ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == DUPLICATE_KEY
        );

        if duplicate_key
            || err.contains_label(TRANSIENT_TRANSACTION_ERROR)
            || err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
        {
            StoreError::Conflict(err.to_string())
        } else {
            StoreError::Backend(err.into())
        }
    }
}

/// Streak row keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StreakDocument {
    #[serde(rename = "_id")]
    user_id: String,
    current_streak: u32,
    longest_streak: u32,
    last_active_date: NaiveDate,
}

impl StreakDocument {
    fn new(user_id: &str, streak: &Streak) -> Self {
        Self {
            user_id: user_id.to_string(),
            current_streak: streak.current_streak,
            longest_streak: streak.longest_streak,
            last_active_date: streak.last_active_date,
        }
    }
}

impl From<StreakDocument> for Streak {
    fn from(doc: StreakDocument) -> Self {
        Streak {
            current_streak: doc.current_streak,
            longest_streak: doc.longest_streak,
            last_active_date: doc.last_active_date,
        }
    }
}

fn xp_sum_pipeline(user_id: &str) -> Vec<Document> {
    vec![
        doc! { "$match": { "user_id": user_id } },
        doc! { "$group": { "_id": null, "total": { "$sum": "$amount" } } },
    ]
}

fn read_total(doc: &Document) -> i64 {
    match doc.get("total") {
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}

#[derive(Clone)]
pub struct MongoProgressStore {
    client: Client,
    db: Database,
}

impl MongoProgressStore {
    pub fn new(client: Client, database: &str) -> Self {
        let db = client.database(database);
        Self { client, db }
    }

    fn lessons(&self) -> Collection<Lesson> {
        self.db.collection(collections::LESSONS)
    }

    fn problems(&self) -> Collection<Problem> {
        self.db.collection(collections::PROBLEMS)
    }

    fn attempts(&self) -> Collection<Attempt> {
        self.db.collection(collections::ATTEMPTS)
    }

    fn submissions(&self) -> Collection<SubmissionRecord> {
        self.db.collection(collections::SUBMISSIONS)
    }

    fn xp_ledger(&self) -> Collection<XpEntry> {
        self.db.collection(collections::XP_LEDGER)
    }

    fn streaks(&self) -> Collection<StreakDocument> {
        self.db.collection(collections::STREAKS)
    }

    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        tracing::info!("Creating indexes for progression collections");

        // One attempt row per (user, problem); racing inserts fail with 11000.
        let attempt_pair = IndexModel::builder()
            .keys(doc! { "user_id": 1, "problem_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_problem_unique".to_string())
                    .build(),
            )
            .build();

        let submission_token = IndexModel::builder()
            .keys(doc! { "user_id": 1, "problem_id": 1, "attempt_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_problem_attempt_unique".to_string())
                    .build(),
            )
            .build();

        let attempt_activity = IndexModel::builder()
            .keys(doc! { "user_id": 1, "updated_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_updated_at".to_string())
                    .build(),
            )
            .build();

        let ledger_user = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(IndexOptions::builder().name("user_id".to_string()).build())
            .build();

        let problem_lesson = IndexModel::builder()
            .keys(doc! { "lesson_id": 1, "order": 1 })
            .options(
                IndexOptions::builder()
                    .name("lesson_order".to_string())
                    .build(),
            )
            .build();

        self.attempts().create_index(attempt_pair).await?;
        self.attempts().create_index(attempt_activity).await?;
        self.submissions().create_index(submission_token).await?;
        self.xp_ledger().create_index(ledger_user).await?;
        self.problems().create_index(problem_lesson).await?;

        tracing::info!("Successfully created progression indexes");
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MongoProgressStore {
    async fn ping(&self) -> StoreResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn list_lessons(&self) -> StoreResult<Vec<Lesson>> {
        track_db_operation("find", collections::LESSONS, async {
            let cursor = self
                .lessons()
                .find(doc! {})
                .sort(doc! { "order": 1, "_id": 1 })
                .await?;
            Ok(cursor.try_collect::<Vec<_>>().await?)
        })
        .await
    }

    async fn find_lesson(&self, lesson_id: &str) -> StoreResult<Option<Lesson>> {
        track_db_operation("find_one", collections::LESSONS, async {
            Ok(self.lessons().find_one(doc! { "_id": lesson_id }).await?)
        })
        .await
    }

    async fn list_problems(&self, lesson_id: &str) -> StoreResult<Vec<Problem>> {
        track_db_operation("find", collections::PROBLEMS, async {
            let cursor = self
                .problems()
                .find(doc! { "lesson_id": lesson_id })
                .sort(doc! { "order": 1, "_id": 1 })
                .await?;
            Ok(cursor.try_collect::<Vec<_>>().await?)
        })
        .await
    }

    async fn list_all_problems(&self) -> StoreResult<Vec<Problem>> {
        track_db_operation("find", collections::PROBLEMS, async {
            let cursor = self.problems().find(doc! {}).await?;
            Ok(cursor.try_collect::<Vec<_>>().await?)
        })
        .await
    }

    async fn find_problem(&self, problem_id: &str) -> StoreResult<Option<Problem>> {
        track_db_operation("find_one", collections::PROBLEMS, async {
            Ok(self.problems().find_one(doc! { "_id": problem_id }).await?)
        })
        .await
    }

    async fn list_attempts(&self, user_id: &str) -> StoreResult<Vec<Attempt>> {
        track_db_operation("find", collections::ATTEMPTS, async {
            let cursor = self.attempts().find(doc! { "user_id": user_id }).await?;
            Ok(cursor.try_collect::<Vec<_>>().await?)
        })
        .await
    }

    async fn has_attempt_since(&self, user_id: &str, since: DateTime<Utc>) -> StoreResult<bool> {
        track_db_operation("find_one", collections::ATTEMPTS, async {
            let found = self
                .attempts()
                .find_one(doc! {
                    "user_id": user_id,
                    "updated_at": { "$gte": chrono_to_bson(since) },
                })
                .await?;
            Ok(found.is_some())
        })
        .await
    }

    async fn find_streak(&self, user_id: &str) -> StoreResult<Option<Streak>> {
        track_db_operation("find_one", collections::STREAKS, async {
            let found = self.streaks().find_one(doc! { "_id": user_id }).await?;
            Ok(found.map(Streak::from))
        })
        .await
    }

    async fn sum_xp(&self, user_id: &str) -> StoreResult<i64> {
        track_db_operation("aggregate", collections::XP_LEDGER, async {
            let mut cursor = self.xp_ledger().aggregate(xp_sum_pipeline(user_id)).await?;
            let total = cursor.try_next().await?.map(|doc| read_total(&doc));
            Ok(total.unwrap_or(0))
        })
        .await
    }

    async fn begin_submission(
        &self,
        user_id: &str,
        problem_id: &str,
    ) -> StoreResult<Box<dyn SubmissionTx>> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        Ok(Box::new(MongoSubmissionTx {
            session,
            attempts: self.attempts(),
            submissions: self.submissions(),
            xp_ledger: self.xp_ledger(),
            streaks: self.streaks(),
            profiles: self.db.collection(collections::USER_PROFILES),
            user_id: user_id.to_string(),
            problem_id: problem_id.to_string(),
        }))
    }
}

/// Multi-document transaction on one client session. Dropping the session
/// while the transaction is open makes the driver abort it.
struct MongoSubmissionTx {
    session: ClientSession,
    attempts: Collection<Attempt>,
    submissions: Collection<SubmissionRecord>,
    xp_ledger: Collection<XpEntry>,
    streaks: Collection<StreakDocument>,
    profiles: Collection<Document>,
    user_id: String,
    problem_id: String,
}

#[async_trait]
impl SubmissionTx for MongoSubmissionTx {
    async fn recorded_outcome(
        &mut self,
        attempt_id: &str,
    ) -> StoreResult<Option<SubmissionOutcome>> {
        let filter = doc! {
            "user_id": &self.user_id,
            "problem_id": &self.problem_id,
            "attempt_id": attempt_id,
        };
        let found = self
            .submissions
            .find_one(filter)
            .session(&mut self.session)
            .await?;
        Ok(found.map(|record| record.outcome))
    }

    async fn attempt(&mut self) -> StoreResult<Option<Attempt>> {
        let filter = doc! { "user_id": &self.user_id, "problem_id": &self.problem_id };
        Ok(self
            .attempts
            .find_one(filter)
            .session(&mut self.session)
            .await?)
    }

    async fn streak(&mut self) -> StoreResult<Option<Streak>> {
        let found = self
            .streaks
            .find_one(doc! { "_id": &self.user_id })
            .session(&mut self.session)
            .await?;
        Ok(found.map(Streak::from))
    }

    async fn upsert_attempt(&mut self, attempt: &Attempt) -> StoreResult<()> {
        let filter = doc! { "user_id": &self.user_id, "problem_id": &self.problem_id };
        self.attempts
            .replace_one(filter, attempt)
            .upsert(true)
            .session(&mut self.session)
            .await?;
        Ok(())
    }

    async fn append_xp(&mut self, entry: &XpEntry) -> StoreResult<()> {
        self.xp_ledger
            .insert_one(entry)
            .session(&mut self.session)
            .await?;
        Ok(())
    }

    async fn upsert_streak(&mut self, streak: &Streak) -> StoreResult<()> {
        let row = StreakDocument::new(&self.user_id, streak);
        self.streaks
            .replace_one(doc! { "_id": &self.user_id }, &row)
            .upsert(true)
            .session(&mut self.session)
            .await?;
        Ok(())
    }

    // A concurrent insert of the same token fails on the unique index and
    // surfaces as a conflict; the retry then finds the committed record.
    async fn record_submission(&mut self, record: &SubmissionRecord) -> StoreResult<()> {
        self.submissions
            .insert_one(record)
            .session(&mut self.session)
            .await?;
        Ok(())
    }

    async fn refresh_total_xp(&mut self, now: DateTime<Utc>) -> StoreResult<i64> {
        let mut cursor = self
            .xp_ledger
            .aggregate(xp_sum_pipeline(&self.user_id))
            .session(&mut self.session)
            .await?;
        let total = match cursor.next(&mut self.session).await {
            Some(doc) => read_total(&doc?),
            None => 0,
        };

        self.profiles
            .update_one(
                doc! { "_id": &self.user_id },
                doc! { "$set": { "total_xp": total, "updated_at": chrono_to_bson(now) } },
            )
            .upsert(true)
            .session(&mut self.session)
            .await?;

        Ok(total)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        track_db_operation("commit", collections::ATTEMPTS, async {
            tx.session.commit_transaction().await?;
            Ok(())
        })
        .await
    }
}
