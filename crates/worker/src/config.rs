use std::path::PathBuf;
use std::time::Duration;

use synthgate_core::admission::{DEFAULT_LOCK_KEY, DEFAULT_LOCK_TTL};

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// PostgreSQL connection string. Required.
    pub database_url: String,
    /// Identity recorded on claimed jobs (default: `$HOSTNAME-<pid>`).
    pub worker_id: String,
    /// Claim loop polling interval (default: 1000 ms).
    pub poll_interval: Duration,
    /// Accelerator lock key (default: `synthgate:accelerator`).
    pub lock_key: String,
    /// Accelerator lock TTL (default: 900 s).
    pub lock_ttl: Duration,
    /// Directory of subject profiles for the analyzer.
    pub metadata_dir: Option<PathBuf>,
    /// Hours finished jobs are kept before the sweeper deletes them.
    pub result_retention_hours: i64,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                    |
    /// |--------------------------|----------------------------|
    /// | `DATABASE_URL`           | (required)                 |
    /// | `WORKER_ID`              | `$HOSTNAME-<pid>`          |
    /// | `POLL_INTERVAL_MS`       | `1000`                     |
    /// | `LOCK_KEY`               | `synthgate:accelerator`    |
    /// | `LOCK_TTL_SECS`          | `900`                      |
    /// | `METADATA_DIR`           | unset                      |
    /// | `RESULT_RETENTION_HOURS` | `24`                       |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let worker_id = std::env::var("WORKER_ID").unwrap_or_else(|_| {
            let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "worker".into());
            format!("{host}-{}", std::process::id())
        });

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

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
            database_url,
            worker_id,
            poll_interval: Duration::from_millis(poll_interval_ms),
            lock_key,
            lock_ttl: Duration::from_secs(lock_ttl_secs),
            metadata_dir,
            result_retention_hours,
        }
    }
}
