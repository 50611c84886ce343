//! The task repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use mixcut_models::{OperationLogEntry, Task, TaskId};

use crate::error::TaskStoreResult;

/// Persistence contract for task records and their operation logs.
///
/// `claim_next` is the only mutually-exclusive update in the system: under
/// concurrent claims on one pending task, exactly one caller receives it.
/// Any backing store offering compare-and-swap semantics on the status
/// field can implement this trait. All state mutations are guarded by the
/// task state machine; writes against terminal tasks are rejected.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persist a new pending task.
    async fn insert(&self, task: Task) -> TaskStoreResult<()>;

    /// Read a task by id.
    async fn get(&self, id: &TaskId) -> TaskStoreResult<Option<Task>>;

    /// Atomically claim the oldest claimable pending task, transitioning it
    /// to processing. Returns None when nothing is eligible.
    async fn claim_next(&self) -> TaskStoreResult<Option<Task>>;

    /// Record progress for a processing task. Values below the stored
    /// progress are dropped (progress is monotone while non-terminal).
    async fn update_progress(&self, id: &TaskId, progress: f32) -> TaskStoreResult<()>;

    /// Finish a processing task successfully with its result reference.
    async fn complete(&self, id: &TaskId, output: String) -> TaskStoreResult<()>;

    /// Finish a processing task with a terminal error.
    async fn fail(&self, id: &TaskId, error: String) -> TaskStoreResult<()>;

    /// Return a processing task to the backlog after a recoverable failure,
    /// eligible again at `next_attempt_at`.
    async fn requeue(&self, id: &TaskId, next_attempt_at: DateTime<Utc>) -> TaskStoreResult<()>;

    /// Cancel a pending or processing task. Returns whether a transition
    /// happened; terminal tasks are left untouched.
    async fn cancel(&self, id: &TaskId) -> TaskStoreResult<bool>;

    /// Append one stage outcome to the operation log.
    async fn append_log(&self, entry: OperationLogEntry) -> TaskStoreResult<()>;

    /// Read the operation log for a task, in append order.
    async fn log_entries(&self, id: &TaskId) -> TaskStoreResult<Vec<OperationLogEntry>>;
}

/// Coerce a failure message so failed tasks always carry a non-empty error.
pub(crate) fn non_empty_error(error: String) -> String {
    if error.trim().is_empty() {
        "unknown error".to_string()
    } else {
        error
    }
}

/// Current time; a seam for repository implementations.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}
