//! Like handlers.
//!
//! - `POST   /api/tweets/{id}/likes` — like a tweet.
//! - `DELETE /api/tweets/{id}/likes` — withdraw a like.
//!
//! Liking one's own tweet is allowed.

use axum::{extract::State, http::StatusCode, Json};
use microblog::TweetId;
use microblog_api::Ack;

use crate::error::AppError;
use crate::extract::AppPath;
use crate::middleware::auth::RequireAuth;

use super::AppState;

/// `POST /api/tweets/{id}/likes` — returns 404 for an unknown tweet, 423 if
/// already liked, 201 on success.
pub async fn like(
    State(state): State<AppState>,
    auth: RequireAuth,
    AppPath(id): AppPath<TweetId>,
) -> Result<(StatusCode, Json<Ack>), AppError> {
    state.storage.like(id, auth.user.id).await?;
    Ok((StatusCode::CREATED, Json(Ack::ok())))
}

/// `DELETE /api/tweets/{id}/likes` — returns 404 for an unknown tweet, 423 if
/// not liked, 200 on success.
pub async fn unlike(
    State(state): State<AppState>,
    auth: RequireAuth,
    AppPath(id): AppPath<TweetId>,
) -> Result<Json<Ack>, AppError> {
    state.storage.unlike(id, auth.user.id).await?;
    Ok(Json(Ack::ok()))
}
