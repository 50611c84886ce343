//! Task submission service.
//!
//! The caller-facing surface of the core: submit a configuration, poll a
//! snapshot, cancel. Validation runs synchronously at submission; execution
//! errors are observed only by polling the terminal state.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use mixcut_models::{OperationConfig, TaskId, TaskSnapshot, ValidationError};

use crate::error::TaskStoreError;
use crate::repository::TaskRepository;

/// Submission failure.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("task store error: {0}")]
    Store(#[from] TaskStoreError),
}

/// Caller facade over the task repository.
#[derive(Clone)]
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
    max_retries: u32,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self {
            repo,
            max_retries: 3,
        }
    }

    /// Override the per-task retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validate and persist a new task. No task record is created when
    /// validation fails.
    pub async fn submit(
        &self,
        inputs: Vec<String>,
        config: OperationConfig,
    ) -> Result<TaskId, SubmitError> {
        let config = config.validate()?;

        let kind = config.kind();
        let required = kind.min_inputs();
        if inputs.len() < required {
            return Err(ValidationError::NotEnoughInputs {
                kind,
                required,
                given: inputs.len(),
            }
            .into());
        }

        let task = mixcut_models::Task::new(inputs, config).with_max_retries(self.max_retries);
        let id = task.id.clone();
        self.repo.insert(task).await?;
        info!(task_id = %id, operation = %kind, "Task submitted");
        Ok(id)
    }

    /// Poll a task's current state.
    pub async fn get(&self, id: &TaskId) -> Result<Option<TaskSnapshot>, TaskStoreError> {
        Ok(self.repo.get(id).await?.map(|t| t.snapshot()))
    }

    /// Request cancellation. Returns whether a transition happened.
    pub async fn cancel(&self, id: &TaskId) -> Result<bool, TaskStoreError> {
        let cancelled = self.repo.cancel(id).await?;
        if cancelled {
            info!(task_id = %id, "Task cancelled");
        }
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;
    use mixcut_models::{OperationKind, TaskState, TextOverlayConfig};

    fn service() -> (TaskService, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        (TaskService::new(repo.clone()), repo)
    }

    fn text_config(text: &str) -> OperationConfig {
        OperationConfig::TextOverlay(TextOverlayConfig::new(text))
    }

    #[tokio::test]
    async fn test_submit_creates_pending_task() {
        let (service, repo) = service();
        let id = service
            .submit(vec!["in/base.mp4".into()], text_config("hi"))
            .await
            .unwrap();

        let task = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(task.state, TaskState::Pending);
        assert_eq!(task.operation, OperationKind::TextOverlay);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_config_without_task() {
        let (service, repo) = service();
        let err = service
            .submit(vec!["in/base.mp4".into()], text_config("   "))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::EmptyText)
        ));
        // No record was created.
        assert!(repo.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_submit_checks_input_arity() {
        let (service, _) = service();
        let err = service
            .submit(
                vec!["only-one.mp4".into()],
                OperationConfig::Join(mixcut_models::JoinConfig::default()),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::NotEnoughInputs {
                kind: OperationKind::Join,
                required: 2,
                given: 1,
            })
        ));
    }

    #[tokio::test]
    async fn test_get_snapshot_shape() {
        let (service, _) = service();
        let id = service
            .submit(vec!["in/base.mp4".into()], text_config("hi"))
            .await
            .unwrap();

        let snapshot = service.get(&id).await.unwrap().unwrap();
        assert_eq!(snapshot.state, TaskState::Pending);
        assert_eq!(snapshot.progress, 0.0);
        assert!(snapshot.result.is_none());
        assert!(snapshot.error.is_none());

        assert!(service.get(&TaskId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_acknowledges_transition() {
        let (service, _) = service();
        let id = service
            .submit(vec!["in/base.mp4".into()], text_config("hi"))
            .await
            .unwrap();

        assert!(service.cancel(&id).await.unwrap());
        assert!(!service.cancel(&id).await.unwrap());
        let snapshot = service.get(&id).await.unwrap().unwrap();
        assert_eq!(snapshot.state, TaskState::Cancelled);
    }
}
