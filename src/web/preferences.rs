use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::Topic;

use super::auth::CurrentUser;
use super::{ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(default)]
    topics: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct Preferences {
    pub selected_topic_ids: Vec<i64>,
    pub all_topics: Vec<Topic>,
    /// `None` when the plan is unlimited.
    pub topic_limit: Option<u32>,
}

pub async fn get_preferences(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Preferences>, ApiError> {
    Ok(Json(load(&state, user.id).await?))
}

/// Replace the user's topic selection, refusing selections larger than
/// the current plan allows.
pub async fn update_preferences(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<PreferencesUpdate>,
) -> Result<Json<Preferences>, ApiError> {
    let mut topics = body.topics;
    topics.sort_unstable();
    topics.dedup();

    let limit = state.repository.topic_limit_for(user.id, Utc::now()).await?;
    if let Some(limit) = limit {
        if topics.len() > limit as usize {
            return Err(ApiError::BadRequest(format!(
                "Your plan allows only {} topics.",
                limit
            )));
        }
    }

    state.repository.set_selected_topics(user.id, topics).await?;
    tracing::info!("Updated topic preferences for {}", user.username);

    Ok(Json(load(&state, user.id).await?))
}

async fn load(state: &AppState, user_id: i64) -> Result<Preferences, ApiError> {
    Ok(Preferences {
        selected_topic_ids: state.repository.get_selected_topic_ids(user_id).await?,
        all_topics: state.repository.list_topics().await?,
        topic_limit: state.repository.topic_limit_for(user_id, Utc::now()).await?,
    })
}
