pub mod answer;
pub mod content;
pub mod profile;
pub mod streak;
pub mod xp;

pub use answer::{Attempt, SubmissionOutcome, SubmissionRecord, SubmitAnswerRequest};
pub use content::{Lesson, LessonProgress, Problem, ProblemType};
pub use profile::{LevelProgress, UserProfile};
pub use streak::Streak;
pub use xp::XpEntry;
