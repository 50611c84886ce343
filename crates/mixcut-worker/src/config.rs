//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent tasks (bounded by engine execution slots)
    pub max_concurrent_tasks: usize,
    /// Backlog poll interval when no task is available
    pub poll_interval: Duration,
    /// How often an in-flight task checks for a cancellation request
    pub cancel_poll_interval: Duration,
    /// Per-stage engine timeout
    pub stage_timeout: Duration,
    /// Graceful shutdown drain timeout
    pub shutdown_timeout: Duration,
    /// Work directory for task scratch workspaces
    pub work_dir: String,
    /// Base delay for the requeue backoff schedule (doubles per retry)
    pub retry_base_delay: Duration,
    /// Cap for the requeue backoff schedule
    pub retry_max_delay: Duration,
    /// Attempts for individual storage-gateway calls
    pub storage_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 2,
            poll_interval: Duration::from_millis(1000),
            cancel_poll_interval: Duration::from_millis(2000),
            stage_timeout: Duration::from_secs(1800), // 30 minutes
            shutdown_timeout: Duration::from_secs(30),
            work_dir: "/tmp/mixcut".to_string(),
            retry_base_delay: Duration::from_secs(5),
            retry_max_delay: Duration::from_secs(300),
            storage_retries: 3,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_tasks: std::env::var("WORKER_MAX_TASKS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            poll_interval: Duration::from_millis(
                std::env::var("WORKER_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            cancel_poll_interval: Duration::from_millis(
                std::env::var("WORKER_CANCEL_POLL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            stage_timeout: Duration::from_secs(
                std::env::var("WORKER_STAGE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/mixcut".to_string()),
            retry_base_delay: Duration::from_millis(
                std::env::var("WORKER_RETRY_BASE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5000),
            ),
            retry_max_delay: Duration::from_secs(
                std::env::var("WORKER_RETRY_MAX_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            storage_retries: std::env::var("WORKER_STORAGE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
        }
    }
}
