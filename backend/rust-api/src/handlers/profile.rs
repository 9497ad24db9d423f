use axum::{extract::State, Json};
use std::sync::Arc;

use super::ApiError;
use crate::extractors::CurrentUser;
use crate::models::UserProfile;
use crate::services::AppState;

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserProfile>, ApiError> {
    tracing::debug!(user_id = %user_id, "Fetching profile");
    let profile = state.profiles().get_profile(&user_id).await?;
    Ok(Json(profile))
}
