use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::models::User;

use super::{ApiError, AppState};

/// Header carrying the id of the acting user.
pub const USER_HEADER: &str = "x-user-id";

/// The user a request acts for. Rejects with 401 when the header is
/// missing, malformed or names no user.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or(ApiError::Unauthorized)?;

        let user = state
            .repository
            .get_user(user_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(CurrentUser(user))
    }
}
