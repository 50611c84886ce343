//! Worker error taxonomy.
//!
//! Execution-time failures split into transient (retried with backoff up to
//! the task's budget), fatal (terminal on first occurrence), and
//! cancellation (terminal, explicitly not a failure). Validation failures
//! never reach the worker; they are rejected at submission.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// I/O hiccups, timeouts, temporary engine or storage unavailability.
    #[error("transient execution error: {0}")]
    Transient(String),

    /// Unsupported input, engine crash on malformed media, bad references.
    #[error("fatal execution error: {0}")]
    Fatal(String),

    /// User-initiated cancellation.
    #[error("task cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl WorkerError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Whether the failure is worth a requeue.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkerError::Transient(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Cancelled)
    }
}

impl From<mixcut_media::MediaError> for WorkerError {
    fn from(e: mixcut_media::MediaError) -> Self {
        match e {
            mixcut_media::MediaError::Cancelled => WorkerError::Cancelled,
            other if other.is_transient() => WorkerError::Transient(other.to_string()),
            other => WorkerError::Fatal(other.to_string()),
        }
    }
}

impl From<mixcut_storage::StorageError> for WorkerError {
    fn from(e: mixcut_storage::StorageError) -> Self {
        if e.is_transient() {
            WorkerError::Transient(e.to_string())
        } else {
            WorkerError::Fatal(e.to_string())
        }
    }
}

impl From<mixcut_tasks::TaskStoreError> for WorkerError {
    fn from(e: mixcut_tasks::TaskStoreError) -> Self {
        if e.is_transient() {
            WorkerError::Transient(e.to_string())
        } else {
            WorkerError::Fatal(e.to_string())
        }
    }
}

impl From<std::io::Error> for WorkerError {
    fn from(e: std::io::Error) -> Self {
        WorkerError::Transient(e.to_string())
    }
}
