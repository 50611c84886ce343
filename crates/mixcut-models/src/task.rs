//! Task record and lifecycle state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::config::{OperationConfig, OperationKind};

/// Unique identifier for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new random task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting in the backlog for a worker
    #[default]
    Pending,
    /// Claimed by a worker and executing
    Processing,
    /// Finished successfully, result available
    Completed,
    /// Finished with an error
    Failed,
    /// Cancelled by the caller
    Cancelled,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Processing => "processing",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }

    /// Whether the state machine permits `self -> next`.
    ///
    /// Pending may be claimed or cancelled; Processing may finish, fail,
    /// be cancelled, or be requeued for a retry. Terminal states are frozen.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        match self {
            TaskState::Pending => matches!(next, TaskState::Processing | TaskState::Cancelled),
            TaskState::Processing => matches!(
                next,
                TaskState::Completed
                    | TaskState::Failed
                    | TaskState::Cancelled
                    | TaskState::Pending
            ),
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled => false,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_max_retries() -> u32 {
    3
}

/// A unit of asynchronous media-transformation work.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    /// Unique task ID
    pub id: TaskId,

    /// Operation type (derived from the config variant)
    pub operation: OperationKind,

    /// Validated operation configuration
    pub config: OperationConfig,

    /// Input media references (storage gateway keys)
    pub inputs: Vec<String>,

    /// Result reference, present only once completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Lifecycle state
    #[serde(default)]
    pub state: TaskState,

    /// Progress percentage (0.0-100.0), monotone while non-terminal
    #[serde(default)]
    pub progress: f32,

    /// Error message, present only when failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Number of recoverable-failure requeues so far
    #[serde(default)]
    pub retry_count: u32,

    /// Maximum requeues before the task fails terminally
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Earliest time the task may be claimed again (backoff window)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Completion timestamp (any terminal state)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending task.
    pub fn new(inputs: Vec<String>, config: OperationConfig) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            operation: config.kind(),
            config,
            inputs,
            output: None,
            state: TaskState::Pending,
            progress: 0.0,
            error_message: None,
            retry_count: 0,
            max_retries: default_max_retries(),
            next_attempt_at: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Override the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Whether the task is pending and past its backoff window.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.state == TaskState::Pending
            && self.next_attempt_at.map_or(true, |at| at <= now)
    }

    /// Whether another recoverable-failure requeue is allowed.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Claim the task for execution.
    pub fn start(mut self) -> Self {
        self.state = TaskState::Processing;
        self.next_attempt_at = None;
        self.updated_at = Utc::now();
        self
    }

    /// Finish successfully with a result reference.
    pub fn complete(mut self, output: impl Into<String>) -> Self {
        self.state = TaskState::Completed;
        self.output = Some(output.into());
        self.error_message = None;
        self.progress = 100.0;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self
    }

    /// Finish with a terminal error.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.state = TaskState::Failed;
        self.error_message = Some(error.into());
        self.output = None;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self
    }

    /// Cancel the task. Cancelled tasks carry no error message.
    pub fn cancel(mut self) -> Self {
        self.state = TaskState::Cancelled;
        self.error_message = None;
        self.output = None;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self
    }

    /// Return the task to the backlog after a recoverable failure.
    pub fn requeue(mut self, next_attempt_at: DateTime<Utc>) -> Self {
        self.state = TaskState::Pending;
        self.retry_count += 1;
        self.next_attempt_at = Some(next_attempt_at);
        self.updated_at = Utc::now();
        self
    }

    /// Caller-facing snapshot for polling.
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id.clone(),
            operation: self.operation,
            state: self.state,
            progress: self.progress,
            result: self.output.clone(),
            error: self.error_message.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Point-in-time view of a task, returned to polling callers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub operation: OperationKind,
    pub state: TaskState,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::text_overlay_config;

    #[test]
    fn test_task_creation() {
        let task = Task::new(vec!["in/base.mp4".into()], text_overlay_config());
        assert_eq!(task.state, TaskState::Pending);
        assert_eq!(task.operation, OperationKind::TextOverlay);
        assert_eq!(task.progress, 0.0);
        assert!(task.error_message.is_none());
    }

    #[test]
    fn test_transition_matrix() {
        use TaskState::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Pending));

        for terminal in [Completed, Failed, Cancelled] {
            for next in [Pending, Processing, Completed, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_complete_clears_error() {
        let task = Task::new(vec!["a".into()], text_overlay_config())
            .start()
            .complete("out/result.mp4");
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.output.as_deref(), Some("out/result.mp4"));
        assert!(task.error_message.is_none());
        assert_eq!(task.progress, 100.0);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_cancel_carries_no_error() {
        let task = Task::new(vec!["a".into()], text_overlay_config())
            .start()
            .cancel();
        assert_eq!(task.state, TaskState::Cancelled);
        assert!(task.error_message.is_none());
        assert!(task.output.is_none());
    }

    #[test]
    fn test_requeue_and_retry_budget() {
        let mut task =
            Task::new(vec!["a".into()], text_overlay_config()).with_max_retries(2);
        assert!(task.can_retry());

        task = task.start().requeue(Utc::now());
        assert_eq!(task.state, TaskState::Pending);
        assert_eq!(task.retry_count, 1);
        assert!(task.can_retry());

        task = task.start().requeue(Utc::now());
        assert_eq!(task.retry_count, 2);
        assert!(!task.can_retry());
    }

    #[test]
    fn test_claimable_respects_backoff() {
        let now = Utc::now();
        let mut task = Task::new(vec!["a".into()], text_overlay_config());
        assert!(task.is_claimable(now));

        task = task.start().requeue(now + chrono::Duration::seconds(30));
        assert!(!task.is_claimable(now));
        assert!(task.is_claimable(now + chrono::Duration::seconds(31)));
    }
}
