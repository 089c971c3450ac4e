//! Filesystem store for uploaded image bytes.
//!
//! Files live flat under one root directory and are named
//! `{uuidv7}.{extension}`, so names never collide and sort in upload order.
//! The database only ever holds the relative name.

use std::path::{Component, Path, PathBuf};

use microblog::Media;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid media path: {0}")]
    InvalidPath(String),
}

/// Stores and removes uploaded media files under a fixed root.
#[derive(Debug)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Open the store at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, MediaError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` under a fresh name and return that name.
    ///
    /// The bytes go to a temporary file first and are renamed into place, so
    /// a reader never sees a partially written image.
    pub async fn save(&self, extension: &str, data: &[u8]) -> Result<String, MediaError> {
        let name = format!("{}.{extension}", Uuid::now_v7());
        let path = self.resolve(&name)?;
        let temp_path = self.root.join(format!(".tmp.{name}"));
        write_atomic(&temp_path, &path, data).await?;
        tracing::debug!(%name, size = data.len(), "stored media file");
        Ok(name)
    }

    /// Delete the file at `name`. Returns `false` if it was already gone.
    pub async fn remove(&self, name: &str) -> Result<bool, MediaError> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MediaError::Io(e)),
        }
    }

    /// Best-effort removal of the files behind `medias`, after their rows are
    /// gone. Failures are logged and skipped.
    pub async fn remove_all(&self, medias: &[Media]) {
        for media in medias {
            match self.remove(&media.path).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(
                        media_id = media.id,
                        path = %media.path,
                        "media file already missing"
                    )
                }
                Err(e) => {
                    tracing::warn!(
                        media_id = media.id,
                        path = %media.path,
                        error = %e,
                        "failed to remove media file"
                    )
                }
            }
        }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, MediaError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(name)),
            _ => Err(MediaError::InvalidPath(name.to_string())),
        }
    }
}

/// Write `data` to `temp_path`, fsync, then rename onto `path`. The temp file
/// is removed if any step fails.
async fn write_atomic(temp_path: &Path, path: &Path, data: &[u8]) -> Result<(), MediaError> {
    if let Err(e) = write_then_rename(temp_path, path, data).await {
        let _ = fs::remove_file(temp_path).await;
        return Err(MediaError::Io(e));
    }
    Ok(())
}

async fn write_then_rename(temp_path: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
    }
    fs::rename(temp_path, path).await
}
