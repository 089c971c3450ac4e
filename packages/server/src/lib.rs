//! Public surface for the `microblog-server` crate.
//!
//! Exposes the router builder, storage backends, and config types so that
//! external crates (e.g. the conformance test suite) can spin up an
//! in-process server without spawning a subprocess.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod router;
pub mod seed;
pub mod storage;

pub use config::{ConfigError, ServerConfig};
pub use media::MediaStore;
pub use router::build_router;
pub use seed::seed_demo;
pub use storage::{memory::MemoryStorage, sqlite::SqliteStorage, Storage};
