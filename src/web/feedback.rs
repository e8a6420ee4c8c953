use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::models::Comment;

use super::auth::CurrentUser;
use super::{ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    content: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(crumb_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.repository.list_comments(crumb_id).await?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(crumb_id): Path<i64>,
    ApiJson(body): ApiJson<NewComment>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Comment cannot be empty.".into()));
    }
    if state.repository.get_crumb(crumb_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Crumb {} not found", crumb_id)));
    }

    let comment = state.repository.add_comment(&user, crumb_id, content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
