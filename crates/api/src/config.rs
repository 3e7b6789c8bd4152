use std::path::PathBuf;
use std::time::Duration;

use synthgate_core::admission::{DEFAULT_LOCK_KEY, DEFAULT_LOCK_TTL};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Largest accepted request body in bytes (default: 20 MiB).
    pub max_upload_bytes: usize,
    /// PostgreSQL connection string. When unset the server runs standalone
    /// with in-memory stores and an embedded worker.
    pub database_url: Option<String>,
    /// Accelerator lock key.
    pub lock_key: String,
    /// Accelerator lock TTL.
    pub lock_ttl: Duration,
    /// Directory of subject profiles for `/analyze`.
    pub metadata_dir: Option<PathBuf>,
    /// Hours a finished job is kept in standalone mode (default: `24`).
    pub result_retention_hours: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                    |
    /// |--------------------------|----------------------------|
    /// | `HOST`                   | `0.0.0.0`                  |
    /// | `PORT`                   | `8000`                     |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                       |
    /// | `MAX_UPLOAD_BYTES`       | `20971520`                 |
    /// | `DATABASE_URL`           | unset (standalone)         |
    /// | `LOCK_KEY`               | `synthgate:accelerator`    |
    /// | `LOCK_TTL_SECS`          | `900`                      |
    /// | `METADATA_DIR`           | unset                      |
    /// | `RESULT_RETENTION_HOURS` | `24`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| (20 * 1024 * 1024).to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.is_empty());

        let lock_key = std::env::var("LOCK_KEY").unwrap_or_else(|_| DEFAULT_LOCK_KEY.into());

        let lock_ttl_secs: u64 = std::env::var("LOCK_TTL_SECS")
            .map(|v| v.parse().expect("LOCK_TTL_SECS must be a valid u64"))
            .unwrap_or(DEFAULT_LOCK_TTL.as_secs());

        let metadata_dir = std::env::var("METADATA_DIR").ok().map(PathBuf::from);

        let result_retention_hours: i64 = std::env::var("RESULT_RETENTION_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse()
            .expect("RESULT_RETENTION_HOURS must be a valid i64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_upload_bytes,
            database_url,
            lock_key,
            lock_ttl: Duration::from_secs(lock_ttl_secs),
            metadata_dir,
            result_retention_hours,
        }
    }
}
