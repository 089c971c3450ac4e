//! HTTP request handlers for every `/api` endpoint.
//!
//! Each submodule covers one resource. Handlers are thin async functions:
//! they authenticate via [`RequireAuth`], call exactly one storage operation
//! (which carries its own atomicity), and render the result. Domain refusals
//! surface as [`AppError`] through `?`.
//!
//! [`RequireAuth`]: crate::middleware::auth::RequireAuth
//! [`AppError`]: crate::error::AppError

pub mod follows;
pub mod likes;
pub mod media;
pub mod tweets;
pub mod users;

use std::sync::Arc;

use crate::{media::MediaStore, storage::Storage};

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub media: Arc<MediaStore>,
}
