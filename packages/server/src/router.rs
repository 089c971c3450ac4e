//! Assembles the Axum [`Router`] from all handler modules.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    error::AppError,
    handlers::{follows, likes, media, tweets, users, AppState},
    media::MediaStore,
    storage::Storage,
};

/// Build the complete application router with shared state.
pub fn build_router(
    storage: Arc<dyn Storage>,
    media: Arc<MediaStore>,
    config: ServerConfig,
) -> Router {
    let state = AppState { storage, media };

    Router::new()
        // Tweets
        .route("/api/tweets", get(tweets::feed).post(tweets::create))
        .route("/api/tweets/{id}", delete(tweets::delete))
        .route(
            "/api/tweets/{id}/likes",
            post(likes::like).delete(likes::unlike),
        )
        // Media
        .route("/api/medias", post(media::upload))
        // Users
        .route("/api/users/me", get(users::me))
        .route("/api/users/{id}", get(users::get_by_id))
        .route(
            "/api/users/{id}/follow",
            post(follows::follow).delete(follows::unfollow),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".into())
}
