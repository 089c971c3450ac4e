//! Application-level error type returned by handlers.
//!
//! Every variant renders as the [`ErrorResponse`] envelope with the matching
//! HTTP status code. Domain refusals coming out of storage are translated to
//! their client-facing messages here and nowhere else.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use microblog::{DomainError, FollowAction, ValidationError};
use microblog_api::ErrorResponse;

use crate::media::MediaError;
use crate::storage::StorageError;

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    UnprocessableEntity(String),
    /// 423: the request conflicts with the current state of the resource.
    Locked(String),
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Locked(_) => StatusCode::LOCKED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::BadRequest(m)
            | AppError::Unauthorized(m)
            | AppError::NotFound(m)
            | AppError::UnprocessableEntity(m)
            | AppError::Locked(m)
            | AppError::Internal(m) => m,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse::new(status.as_u16(), self.message());
        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::SelfReference(FollowAction::Follow) => {
                AppError::UnprocessableEntity("You can't subscribe to yourself".into())
            }
            DomainError::SelfReference(FollowAction::Unfollow) => {
                AppError::UnprocessableEntity("You can't unsubscribe from yourself".into())
            }
            DomainError::TargetNotFound {
                action: FollowAction::Follow,
                ..
            } => AppError::NotFound("The subscription user was not found".into()),
            DomainError::TargetNotFound {
                action: FollowAction::Unfollow,
                ..
            } => AppError::NotFound("The user to cancel the subscription was not found".into()),
            DomainError::AlreadyFollowing { .. } => {
                AppError::Locked("The user is already subscribed".into())
            }
            DomainError::NotFollowing { .. } => {
                AppError::Locked("The user is not among the subscribers".into())
            }
            DomainError::TweetNotFound(_) => AppError::NotFound("Tweet not found".into()),
            DomainError::AlreadyLiked { .. } => {
                AppError::Locked("The user has already liked this tweet".into())
            }
            DomainError::NotLiked { .. } => {
                AppError::Locked("The user has not yet liked this tweet".into())
            }
            DomainError::NotTweetAuthor { .. } => {
                AppError::Locked("The tweet that is being accessed is locked".into())
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::UnprocessableEntity(e.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Domain(d) => {
                tracing::warn!(reason = %d, "transition rejected");
                d.into()
            }
            StorageError::Conflict(msg) => AppError::Locked(msg),
            StorageError::Internal(msg) => {
                tracing::error!(error = %msg, "storage failure");
                AppError::Internal(msg)
            }
        }
    }
}

impl From<MediaError> for AppError {
    fn from(e: MediaError) -> Self {
        tracing::error!(error = %e, "media store failure");
        AppError::Internal(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::UnprocessableEntity(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::UnprocessableEntity(rejection.body_text())
    }
}
