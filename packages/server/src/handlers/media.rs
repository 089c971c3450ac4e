//! Media upload handler.
//!
//! - `POST /api/medias` — multipart upload with a single `file` field.
//!
//! The returned id is later passed in `tweet_media_ids`. An upload nobody
//! claims simply stays unattached.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use microblog::image_extension;
use microblog_api::MediaCreated;

use crate::error::AppError;
use crate::middleware::auth::RequireAuth;

use super::AppState;

const FILE_FIELD: &str = "file";
const NO_FILE: &str = "The image was not attached to the request";

fn malformed(e: MultipartError) -> AppError {
    AppError::UnprocessableEntity(e.body_text())
}

/// `POST /api/medias` — store an image and return its media id.
///
/// Returns 400 when no `file` part is present (or the request is not
/// multipart at all), 422 when the extension is not gif, jpeg, jpg, or png,
/// and 201 on success.
pub async fn upload(
    State(state): State<AppState>,
    _auth: RequireAuth,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<MediaCreated>), AppError> {
    let mut multipart = multipart.map_err(|_| AppError::BadRequest(NO_FILE.into()))?;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().filter(|n| !n.is_empty()).map(str::to_owned)
        else {
            return Err(AppError::BadRequest(NO_FILE.into()));
        };
        let extension = image_extension(&file_name)?;
        let data = field.bytes().await.map_err(malformed)?;
        if data.is_empty() {
            return Err(AppError::BadRequest(NO_FILE.into()));
        }

        let path = state.media.save(&extension, &data).await?;
        let media = match state.storage.create_media(&path).await {
            Ok(media) => media,
            Err(e) => {
                if let Err(cleanup) = state.media.remove(&path).await {
                    tracing::warn!(%path, error = %cleanup, "failed to remove orphaned upload");
                }
                return Err(e.into());
            }
        };
        tracing::info!(media_id = media.id, %path, size = data.len(), "media uploaded");
        return Ok((StatusCode::CREATED, Json(MediaCreated::new(media.id))));
    }

    Err(AppError::BadRequest(NO_FILE.into()))
}
