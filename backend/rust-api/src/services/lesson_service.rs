use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::errors::{ProgressError, ProgressResult};
use crate::models::answer::ProblemAttemptView;
use crate::models::content::{LessonDetail, LessonSummary, ProblemView};
use crate::models::{Attempt, LessonProgress, Problem};
use crate::store::ProgressStore;

/// Ids of the problems `attempts` answered correctly.
pub(crate) fn solved_problems(attempts: &[Attempt]) -> HashSet<&str> {
    attempts
        .iter()
        .filter(|attempt| attempt.is_correct)
        .map(|attempt| attempt.problem_id.as_str())
        .collect()
}

/// Problem count and derived progress of one lesson.
pub(crate) fn lesson_progress(
    problems: &[Problem],
    lesson_id: &str,
    solved: &HashSet<&str>,
) -> (usize, LessonProgress) {
    let (total, correct) = problems
        .iter()
        .filter(|problem| problem.lesson_id == lesson_id)
        .fold((0, 0), |(total, correct), problem| {
            (
                total + 1,
                correct + usize::from(solved.contains(problem.id.as_str())),
            )
        });
    (total, LessonProgress::derive(correct, total))
}

pub struct LessonService {
    store: Arc<dyn ProgressStore>,
}

impl LessonService {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    pub async fn list_lessons(&self, user_id: &str) -> ProgressResult<Vec<LessonSummary>> {
        let (lessons, problems, attempts) = tokio::try_join!(
            self.store.list_lessons(),
            self.store.list_all_problems(),
            self.store.list_attempts(user_id),
        )?;
        let solved = solved_problems(&attempts);

        Ok(lessons
            .into_iter()
            .map(|lesson| {
                let (problem_count, progress) = lesson_progress(&problems, &lesson.id, &solved);
                LessonSummary {
                    id: lesson.id,
                    title: lesson.title,
                    description: lesson.description,
                    order: lesson.order,
                    problem_count,
                    completed: progress.completed,
                    percentage: progress.percentage,
                }
            })
            .collect())
    }

    pub async fn get_lesson(&self, user_id: &str, lesson_id: &str) -> ProgressResult<LessonDetail> {
        let lesson = self
            .store
            .find_lesson(lesson_id)
            .await?
            .ok_or_else(|| ProgressError::not_found("Lesson not found"))?;

        let (problems, attempts) = tokio::try_join!(
            self.store.list_problems(lesson_id),
            self.store.list_attempts(user_id),
        )?;
        let solved = solved_problems(&attempts);
        let (_, progress) = lesson_progress(&problems, lesson_id, &solved);

        Ok(LessonDetail {
            id: lesson.id,
            title: lesson.title,
            description: lesson.description,
            order: lesson.order,
            problems: problems.into_iter().map(ProblemView::from).collect(),
            completed: progress.completed,
            percentage: progress.percentage,
        })
    }

    /// One entry per problem of the lesson, attempted or not.
    pub async fn problem_attempts(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> ProgressResult<BTreeMap<String, ProblemAttemptView>> {
        if self.store.find_lesson(lesson_id).await?.is_none() {
            return Err(ProgressError::not_found("Lesson not found"));
        }

        let (problems, attempts) = tokio::try_join!(
            self.store.list_problems(lesson_id),
            self.store.list_attempts(user_id),
        )?;
        let by_problem: HashMap<&str, &Attempt> = attempts
            .iter()
            .map(|attempt| (attempt.problem_id.as_str(), attempt))
            .collect();

        Ok(problems
            .into_iter()
            .map(|problem| {
                let view = by_problem
                    .get(problem.id.as_str())
                    .map(|attempt| ProblemAttemptView::from(*attempt))
                    .unwrap_or_else(ProblemAttemptView::not_attempted);
                (problem.id, view)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::{Catalog, Lesson, ProblemType};
    use crate::models::SubmitAnswerRequest;
    use crate::services::submission_service::SubmissionService;
    use crate::store::MemoryProgressStore;
    use crate::utils::time::ManualClock;
    use chrono::Utc;

    fn store() -> Arc<MemoryProgressStore> {
        let problems = ["p1", "p2"]
            .iter()
            .enumerate()
            .map(|(i, id)| Problem {
                id: id.to_string(),
                lesson_id: "l1".into(),
                problem_type: ProblemType::MultipleChoice,
                question: format!("Pick {}", id),
                canonical_answer: "b".into(),
                options: Vec::new(),
                order: i as i32,
            })
            .collect();
        Arc::new(MemoryProgressStore::with_catalog(Catalog {
            lessons: vec![Lesson {
                id: "l1".into(),
                title: "Shapes".into(),
                description: Some("Angles and sides".into()),
                order: 1,
            }],
            problems,
        }))
    }

    async fn solve(store: Arc<MemoryProgressStore>, problem_id: &str) {
        SubmissionService::new(store, Arc::new(ManualClock::new(Utc::now())))
            .submit(
                "u1",
                "l1",
                &SubmitAnswerRequest {
                    problem_id: problem_id.into(),
                    attempt_id: format!("{}-1", problem_id),
                    answer: "B".into(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_reports_partial_progress() {
        let store = store();
        solve(store.clone(), "p1").await;

        let lessons = LessonService::new(store).list_lessons("u1").await.unwrap();

        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].problem_count, 2);
        assert_eq!(lessons[0].percentage, 50.0);
        assert!(!lessons[0].completed);
    }

    #[tokio::test]
    async fn missing_lesson_is_not_found() {
        let service = LessonService::new(store());

        assert!(matches!(
            service.get_lesson("u1", "nope").await,
            Err(ProgressError::NotFound(_))
        ));
        assert!(matches!(
            service.problem_attempts("u1", "nope").await,
            Err(ProgressError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn attempt_map_covers_every_problem() {
        let store = store();
        solve(store.clone(), "p2").await;

        let map = LessonService::new(store)
            .problem_attempts("u1", "l1")
            .await
            .unwrap();

        assert_eq!(map.len(), 2);
        assert!(!map["p1"].attempted);
        assert!(map["p2"].attempted && map["p2"].is_correct);
        assert!(map["p2"].last_attempted.is_some());
    }
}
