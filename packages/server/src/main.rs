//! `microblog-server` — HTTP backend for a small microblogging service.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory server on the default port:
//! microblog-server
//!
//! # Persistent SQLite server with demo data:
//! MICROBLOG_DB=./microblog.db MICROBLOG_SEED_DEMO=true microblog-server
//!
//! # Custom bind address and media directory:
//! MICROBLOG_BIND=127.0.0.1:8080 MICROBLOG_MEDIA_DIR=/srv/media microblog-server
//! ```
//!
//! # Environment variables
//!
//! See [`ServerConfig`] for the full list.

use std::sync::Arc;

use microblog_server::{
    build_router, seed_demo, MediaStore, MemoryStorage, ServerConfig, SqliteStorage, Storage,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "microblog_server=info,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => {
            tracing::info!("storage: SQLite at {path}");
            Arc::new(SqliteStorage::open(path).map_err(|e| {
                tracing::error!("failed to open SQLite database at {path}: {e}");
                e
            })?)
        }
        None => {
            tracing::info!("storage: in-memory (data will not survive restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    if config.seed_demo {
        seed_demo(storage.as_ref()).await?;
    }

    let media = Arc::new(MediaStore::new(&config.media_dir).await?);
    tracing::info!("media: {}", media.root().display());

    let app = build_router(storage, media, config.clone());

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
