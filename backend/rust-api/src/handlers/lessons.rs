use axum::{
    extract::{Path, State},
    Json,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

use super::ApiError;
use crate::extractors::{AppJson, CurrentUser};
use crate::models::answer::ProblemAttemptView;
use crate::models::content::{LessonDetail, LessonSummary};
use crate::models::{SubmissionOutcome, SubmitAnswerRequest};
use crate::services::AppState;

pub async fn list_lessons(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<LessonSummary>>, ApiError> {
    let lessons = state.lessons().list_lessons(&user_id).await?;
    Ok(Json(lessons))
}

pub async fn get_lesson(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(lesson_id): Path<String>,
) -> Result<Json<LessonDetail>, ApiError> {
    let lesson = state.lessons().get_lesson(&user_id, &lesson_id).await?;
    Ok(Json(lesson))
}

pub async fn problem_attempts(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(lesson_id): Path<String>,
) -> Result<Json<BTreeMap<String, ProblemAttemptView>>, ApiError> {
    let attempts = state
        .lessons()
        .problem_attempts(&user_id, &lesson_id)
        .await?;
    Ok(Json(attempts))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(lesson_id): Path<String>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<Json<SubmissionOutcome>, ApiError> {
    req.validate()?;

    let outcome = state
        .submissions()
        .submit(&user_id, &lesson_id, &req)
        .await?;
    Ok(Json(outcome))
}
