use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lesson {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub order: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemType {
    MultipleChoice,
    Input,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemOption {
    pub id: String,
    pub text: String,
}

/// Stored problem. Carries the canonical answer, so it never leaves the service layer
/// as-is; clients get a [`ProblemView`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Problem {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub lesson_id: String,
    #[serde(rename = "type")]
    pub problem_type: ProblemType,
    pub question: String,
    #[serde(rename = "answer", alias = "canonical_answer")]
    pub canonical_answer: String,
    #[serde(default)]
    pub options: Vec<ProblemOption>,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemView {
    pub id: String,
    #[serde(rename = "type")]
    pub problem_type: ProblemType,
    pub question: String,
    pub options: Vec<ProblemOption>,
    pub order: i32,
}

impl From<Problem> for ProblemView {
    fn from(problem: Problem) -> Self {
        Self {
            id: problem.id,
            problem_type: problem.problem_type,
            question: problem.question,
            options: problem.options,
            order: problem.order,
        }
    }
}

/// Lesson content loaded into the in-memory backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub problems: Vec<Problem>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct LessonProgress {
    pub completed: bool,
    pub percentage: f64,
}

impl LessonProgress {
    /// `completed` holds exactly when every problem of the lesson is solved.
    pub fn derive(correct: usize, total: usize) -> Self {
        if total == 0 {
            return Self::default();
        }
        let correct = correct.min(total);
        let percentage = (correct as f64 / total as f64) * 100.0;
        Self {
            completed: correct == total,
            percentage,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    pub problem_count: usize,
    pub completed: bool,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDetail {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    pub problems: Vec<ProblemView>,
    pub completed: bool,
    pub percentage: f64,
}
