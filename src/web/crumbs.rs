use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::Crumb;

use super::auth::CurrentUser;
use super::{ApiError, AppState};

pub const PAGE_SIZE: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CrumbPage {
    pub page: u32,
    pub new: Vec<Crumb>,
    pub old: Vec<Crumb>,
    pub has_next: bool,
    pub next_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CrumbDetail {
    #[serde(flatten)]
    pub crumb: Crumb,
    pub tags: Vec<String>,
}

/// Newest crumbs first, with today's (UTC) separated from older ones.
pub async fn list_crumbs(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CrumbPage>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let total = state.repository.count_crumbs().await?;
    let crumbs = state
        .repository
        .list_crumbs((page - 1).saturating_mul(PAGE_SIZE), PAGE_SIZE)
        .await?;

    let has_next = u64::from(page) * u64::from(PAGE_SIZE) < u64::from(total);
    Ok(Json(split_by_day(crumbs, Utc::now().date_naive(), page, has_next)))
}

fn split_by_day(crumbs: Vec<Crumb>, today: NaiveDate, page: u32, has_next: bool) -> CrumbPage {
    let (new, old) = crumbs
        .into_iter()
        .partition(|crumb| crumb.published_at.date_naive() == today);

    CrumbPage {
        page,
        new,
        old,
        has_next,
        next_page: has_next.then_some(page + 1),
    }
}

pub async fn get_crumb(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CrumbDetail>, ApiError> {
    let crumb = state
        .repository
        .get_crumb(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Crumb {} not found", id)))?;
    let tags = state.repository.get_crumb_tags(id).await?;

    Ok(Json(CrumbDetail { crumb, tags }))
}

pub async fn toggle_save(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if state.repository.get_crumb(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Crumb {} not found", id)));
    }

    let saved = state.repository.toggle_saved_crumb(user.id, id).await?;
    Ok(Json(json!({ "crumb_id": id, "saved": saved })))
}

pub async fn list_saved(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Crumb>>, ApiError> {
    Ok(Json(state.repository.list_saved_crumbs(user.id).await?))
}
