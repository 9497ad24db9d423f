use axum::{extract::Query, Json};
use serde::Deserialize;

use super::ApiError;
use crate::models::LevelProgress;
use crate::services::level_curve::level_progress;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelQuery {
    pub total_xp: Option<String>,
}

/// Public level curve lookup. A missing `totalXp` means zero.
pub async fn get_level_progress(
    Query(query): Query<LevelQuery>,
) -> Result<Json<LevelProgress>, ApiError> {
    let total_xp = match query.total_xp.as_deref().map(str::trim) {
        None | Some("") => 0,
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| ApiError::bad_request("totalXp must be an integer"))?,
    };
    Ok(Json(level_progress(total_xp)))
}
