use std::sync::Arc;

use crate::errors::ProgressResult;
use crate::models::profile::UserProfile;
use crate::models::streak::StreakView;
use crate::store::ProgressStore;
use crate::utils::time::{start_of_utc_day, Clock};

use super::lesson_service::{lesson_progress, solved_problems};
use super::level_curve::level_progress;

pub struct ProfileService {
    store: Arc<dyn ProgressStore>,
    clock: Arc<dyn Clock>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProgressStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Read-only aggregate. Each part is an independent read, so the result may
    /// straddle a concurrent submission.
    pub async fn get_profile(&self, user_id: &str) -> ProgressResult<UserProfile> {
        let since = start_of_utc_day(self.clock.now());

        let (total_xp, streak, lessons, problems, attempts, active_today) = tokio::try_join!(
            self.store.sum_xp(user_id),
            self.store.find_streak(user_id),
            self.store.list_lessons(),
            self.store.list_all_problems(),
            self.store.list_attempts(user_id),
            self.store.has_attempt_since(user_id, since),
        )?;

        let solved = solved_problems(&attempts);
        let completed_lessons = lessons
            .iter()
            .filter(|lesson| lesson_progress(&problems, &lesson.id, &solved).1.completed)
            .count();

        let progress = if lessons.is_empty() {
            0.0
        } else {
            completed_lessons as f64 * 100.0 / lessons.len() as f64
        };

        let level = level_progress(total_xp);

        tracing::debug!(user_id, total_xp, completed_lessons, "Profile aggregated");

        Ok(UserProfile {
            total_xp,
            progress,
            streak: StreakView::from(streak),
            has_activity_today: active_today,
            level: level.level,
            xp_into_level: level.xp_into_level,
            xp_for_next_level: level.xp_for_next_level,
            level_progress: level.progress_percentage,
        })
    }
}
