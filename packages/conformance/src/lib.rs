//! Shared helpers for the microblog conformance test suite.
//!
//! Provides [`spawn_server`]: a function that binds a `TcpListener` on an
//! ephemeral port, wires up an in-process server backed by `MemoryStorage`
//! and a temporary media directory, and returns handles to all three so
//! tests can pre-populate users without going through the HTTP layer.

use std::sync::Arc;

use microblog_server::{build_router, MediaStore, MemoryStorage, ServerConfig, Storage};
use tempfile::TempDir;

/// A running in-process server.
pub struct TestServer {
    /// Base URL without a trailing slash, e.g. `http://127.0.0.1:51234`.
    pub base_url: String,
    /// The storage instance the server uses.
    pub storage: Arc<MemoryStorage>,
    /// Where uploads land. Deleted when the server handle is dropped.
    pub media_dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Start an ephemeral in-process server.
///
/// The server runs in a background `tokio` task and is bound to an
/// OS-assigned port on `127.0.0.1`. Users are not created over HTTP (there is
/// no registration endpoint); call `storage.create_user` directly.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the media directory cannot
/// be created.
pub async fn spawn_server() -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    let base_url = format!("http://{addr}");

    let media_dir = tempfile::tempdir().expect("create media dir");
    let media = Arc::new(
        MediaStore::new(media_dir.path())
            .await
            .expect("open media store"),
    );

    let storage = Arc::new(MemoryStorage::new());
    let config = ServerConfig {
        bind_addr: addr,
        media_dir: media_dir.path().to_path_buf(),
        ..ServerConfig::default()
    };
    let router = build_router(Arc::clone(&storage) as Arc<dyn Storage>, media, config);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance server error");
    });

    TestServer {
        base_url,
        storage,
        media_dir,
    }
}
