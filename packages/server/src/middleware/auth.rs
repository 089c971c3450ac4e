//! API-key authentication extractor.
//!
//! Every `/api` route takes [`RequireAuth`]. The key travels in the
//! `api-key` header and is resolved against the identity store on each
//! request; there are no sessions.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use microblog::User;

use crate::{error::AppError, handlers::AppState};

/// Name of the request header carrying the caller's credential.
pub const API_KEY_HEADER: &str = "api-key";

const MISSING_KEY: &str = "User authorization error";
const UNKNOWN_KEY: &str = "Sorry. Wrong api-key token. This user does not exist";

/// Axum extractor that resolves the `api-key` header to a user.
///
/// Rejects with 401 if the header is absent, empty, not valid UTF-8, or
/// names no registered user.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    pub user: User,
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = AppState::from_ref(state);
        let key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        async move {
            let key = key.ok_or_else(|| AppError::Unauthorized(MISSING_KEY.into()))?;
            let user = app_state
                .storage
                .user_by_api_key(&key)
                .await?
                .ok_or_else(|| AppError::Unauthorized(UNKNOWN_KEY.into()))?;
            tracing::debug!(user_id = user.id, "authenticated request");
            Ok(RequireAuth { user })
        }
    }
}
