//! Profile handlers.
//!
//! - `GET /api/users/me`   — the caller's own profile.
//! - `GET /api/users/{id}` — any user's profile.

use axum::{extract::State, Json};
use microblog::UserId;
use microblog_api::ProfileResponse;

use crate::error::AppError;
use crate::extract::AppPath;
use crate::middleware::auth::RequireAuth;

use super::AppState;

/// `GET /api/users/me`
pub async fn me(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<ProfileResponse>, AppError> {
    profile(&state, auth.user.id).await
}

/// `GET /api/users/{id}` — returns 404 if no such user exists.
pub async fn get_by_id(
    State(state): State<AppState>,
    _auth: RequireAuth,
    AppPath(id): AppPath<UserId>,
) -> Result<Json<ProfileResponse>, AppError> {
    profile(&state, id).await
}

async fn profile(state: &AppState, id: UserId) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state
        .storage
        .get_profile(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(ProfileResponse::new(profile)))
}
