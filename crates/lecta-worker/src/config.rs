//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent pipeline runs
    pub max_concurrent_jobs: usize,
    /// Interval between poll-loop reads of the job row
    pub poll_interval: Duration,
    /// Poll-loop attempt budget before the run times out
    pub max_poll_attempts: u32,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// SQLite database file
    pub database_path: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 120,
            shutdown_timeout: Duration::from_secs(30),
            database_path: PathBuf::from("lecta.db"),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            poll_interval: Duration::from_secs(
                std::env::var("POLL_INTERVAL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            max_poll_attempts: std::env::var("MAX_POLL_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            database_path: PathBuf::from(
                std::env::var("DATABASE_PATH").unwrap_or_else(|_| "lecta.db".to_string()),
            ),
        }
    }
}
