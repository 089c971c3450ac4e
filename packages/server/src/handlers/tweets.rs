//! Tweet handlers.
//!
//! - `GET    /api/tweets`       — the caller's feed.
//! - `POST   /api/tweets`       — publish a tweet, optionally claiming uploads.
//! - `DELETE /api/tweets/{id}`  — delete one of the caller's own tweets.

use axum::{extract::State, http::StatusCode, Json};
use microblog::{NewTweet, TweetId};
use microblog_api::{Ack, CreateTweetRequest, FeedResponse, TweetCreated};

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::middleware::auth::RequireAuth;

use super::AppState;

/// `GET /api/tweets` — tweets by everyone the caller follows, least liked first.
///
/// The caller's own tweets are not included. Following nobody gives an empty
/// list.
pub async fn feed(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<FeedResponse>, AppError> {
    let tweets = state.storage.feed(auth.user.id).await?;
    Ok(Json(FeedResponse::new(tweets)))
}

/// `POST /api/tweets` — publish a tweet.
///
/// Returns 422 if the text is longer than 280 characters. Media ids that do
/// not exist are ignored. Returns 201 with the new tweet id.
pub async fn create(
    State(state): State<AppState>,
    auth: RequireAuth,
    AppJson(req): AppJson<CreateTweetRequest>,
) -> Result<(StatusCode, Json<TweetCreated>), AppError> {
    let new_tweet = NewTweet::new(
        auth.user.id,
        req.tweet_data,
        req.tweet_media_ids.unwrap_or_default(),
    )?;
    let id = state.storage.create_tweet(&new_tweet).await?;
    tracing::info!(tweet_id = id, author = auth.user.id, "tweet published");
    Ok((StatusCode::CREATED, Json(TweetCreated::new(id))))
}

/// `DELETE /api/tweets/{id}` — delete a tweet the caller wrote.
///
/// Returns 404 if the tweet does not exist and 423 if someone else wrote it.
/// Like records and media rows go with the tweet; the image files are removed
/// once the delete has committed.
pub async fn delete(
    State(state): State<AppState>,
    auth: RequireAuth,
    AppPath(id): AppPath<TweetId>,
) -> Result<Json<Ack>, AppError> {
    let removed = state.storage.delete_tweet(id, auth.user.id).await?;
    state.media.remove_all(&removed).await;
    tracing::info!(tweet_id = id, media = removed.len(), "tweet deleted");
    Ok(Json(Ack::ok()))
}
