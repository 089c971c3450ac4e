//! Server configuration, populated from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default cap on a request body: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Runtime configuration for the microblog server.
///
/// Every field has a default, so the server starts with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `MICROBLOG_BIND` | `0.0.0.0:8000` | TCP socket address to listen on |
/// | `MICROBLOG_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `MICROBLOG_MEDIA_DIR` | `static/images` | Directory uploaded images are written to |
/// | `MICROBLOG_MAX_UPLOAD_BYTES` | `10485760` | Largest accepted request body |
/// | `MICROBLOG_SEED_DEMO` | `false` | Create demo users and tweets on an empty store |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,

    pub media_dir: PathBuf,

    pub max_upload_bytes: usize,

    pub seed_demo: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            db_path: None,
            media_dir: PathBuf::from("static/images"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            seed_demo: false,
        }
    }
}

impl ServerConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("MICROBLOG_BIND") {
            config.bind_addr = value.parse().map_err(|_| ConfigError::Invalid {
                var: "MICROBLOG_BIND",
                expected: "a socket address such as 0.0.0.0:8000",
                value,
            })?;
        }
        config.db_path = lookup("MICROBLOG_DB").filter(|v| !v.is_empty());
        if let Some(dir) = lookup("MICROBLOG_MEDIA_DIR").filter(|v| !v.is_empty()) {
            config.media_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("MICROBLOG_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = value.parse().map_err(|_| ConfigError::Invalid {
                var: "MICROBLOG_MAX_UPLOAD_BYTES",
                expected: "a byte count",
                value,
            })?;
        }
        if let Some(value) = lookup("MICROBLOG_SEED_DEMO") {
            config.seed_demo = parse_flag(&value).ok_or(ConfigError::Invalid {
                var: "MICROBLOG_SEED_DEMO",
                expected: "true or false",
                value,
            })?;
        }
        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let c = from_pairs(&[]).unwrap();
        assert_eq!(c.bind_addr.port(), 8000);
        assert!(c.db_path.is_none());
        assert_eq!(c.media_dir, PathBuf::from("static/images"));
        assert_eq!(c.max_upload_bytes, 10_485_760);
        assert!(!c.seed_demo);
    }

    #[test]
    fn overrides_apply() {
        let c = from_pairs(&[
            ("MICROBLOG_BIND", "127.0.0.1:9000"),
            ("MICROBLOG_DB", "/tmp/blog.db"),
            ("MICROBLOG_MEDIA_DIR", "/srv/media"),
            ("MICROBLOG_MAX_UPLOAD_BYTES", "1024"),
            ("MICROBLOG_SEED_DEMO", "TRUE"),
        ])
        .unwrap();
        assert_eq!(c.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(c.db_path.as_deref(), Some("/tmp/blog.db"));
        assert_eq!(c.media_dir, PathBuf::from("/srv/media"));
        assert_eq!(c.max_upload_bytes, 1024);
        assert!(c.seed_demo);
    }

    #[test]
    fn bad_values_are_reported() {
        let err = from_pairs(&[("MICROBLOG_BIND", "nowhere")]).unwrap_err();
        assert!(err.to_string().contains("MICROBLOG_BIND"));
        assert!(from_pairs(&[("MICROBLOG_SEED_DEMO", "maybe")]).is_err());
        assert!(from_pairs(&[("MICROBLOG_MAX_UPLOAD_BYTES", "-1")]).is_err());
    }
}
