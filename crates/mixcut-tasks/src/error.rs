//! Task store error types.

use thiserror::Error;

use mixcut_models::{TaskId, TaskState};

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Errors from task repositories.
#[derive(Debug, Error)]
pub enum TaskStoreError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Invalid transition {from} -> {to}")]
    InvalidTransition { from: TaskState, to: TaskState },

    #[error("Task is terminal ({0}); write rejected")]
    Terminal(TaskState),

    #[error("Progress updates require a processing task (state is {0})")]
    NotProcessing(TaskState),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl TaskStoreError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TaskStoreError::Redis(_))
    }
}
