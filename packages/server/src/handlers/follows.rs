//! Follow-graph handlers.
//!
//! - `POST   /api/users/{id}/follow` — follow user `{id}`.
//! - `DELETE /api/users/{id}/follow` — stop following user `{id}`.
//!
//! Edges are directed. Following someone never makes them follow back.

use axum::{extract::State, http::StatusCode, Json};
use microblog::UserId;
use microblog_api::Ack;

use crate::error::AppError;
use crate::extract::AppPath;
use crate::middleware::auth::RequireAuth;

use super::AppState;

/// `POST /api/users/{id}/follow` — follow a user.
///
/// Returns 422 when `{id}` is the caller, 404 when no such user exists, 423
/// when the caller already follows them, and 201 on success.
pub async fn follow(
    State(state): State<AppState>,
    auth: RequireAuth,
    AppPath(target): AppPath<UserId>,
) -> Result<(StatusCode, Json<Ack>), AppError> {
    state.storage.follow(auth.user.id, target).await?;
    tracing::info!(follower = auth.user.id, target, "follow added");
    Ok((StatusCode::CREATED, Json(Ack::ok())))
}

/// `DELETE /api/users/{id}/follow` — unfollow a user.
///
/// Same checks as [`follow`], with 423 when the caller does not follow them.
pub async fn unfollow(
    State(state): State<AppState>,
    auth: RequireAuth,
    AppPath(target): AppPath<UserId>,
) -> Result<Json<Ack>, AppError> {
    state.storage.unfollow(auth.user.id, target).await?;
    tracing::info!(follower = auth.user.id, target, "follow removed");
    Ok(Json(Ack::ok()))
}
