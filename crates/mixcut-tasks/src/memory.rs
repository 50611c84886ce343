//! In-memory task repository.
//!
//! All mutations happen under one lock, which gives the claim transition
//! its compare-and-swap exclusivity. Used by tests and single-process
//! deployments.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use mixcut_models::{OperationLogEntry, Task, TaskId, TaskState};

use crate::error::{TaskStoreError, TaskStoreResult};
use crate::repository::{non_empty_error, now, TaskRepository};

#[derive(Default)]
struct Inner {
    tasks: HashMap<String, Task>,
    /// Pending task ids in submission order
    backlog: VecDeque<String>,
    logs: Vec<OperationLogEntry>,
}

/// Repository backed by process memory.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: Mutex<Inner>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_task<T>(
        &self,
        id: &TaskId,
        f: impl FnOnce(&mut Inner, &mut Task) -> TaskStoreResult<T>,
    ) -> TaskStoreResult<T> {
        let mut inner = self.inner.lock().expect("repository lock poisoned");
        let mut task = inner
            .tasks
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| TaskStoreError::NotFound(id.clone()))?;
        let result = f(&mut inner, &mut task)?;
        inner.tasks.insert(task.id.as_str().to_string(), task);
        Ok(result)
    }

    fn guard_transition(task: &Task, to: TaskState) -> TaskStoreResult<()> {
        if task.state.is_terminal() {
            return Err(TaskStoreError::Terminal(task.state));
        }
        if !task.state.can_transition_to(to) {
            return Err(TaskStoreError::InvalidTransition {
                from: task.state,
                to,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for InMemoryRepository {
    async fn insert(&self, task: Task) -> TaskStoreResult<()> {
        let mut inner = self.inner.lock().expect("repository lock poisoned");
        inner.backlog.push_back(task.id.as_str().to_string());
        inner.tasks.insert(task.id.as_str().to_string(), task);
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> TaskStoreResult<Option<Task>> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        Ok(inner.tasks.get(id.as_str()).cloned())
    }

    async fn claim_next(&self) -> TaskStoreResult<Option<Task>> {
        let mut inner = self.inner.lock().expect("repository lock poisoned");
        let now = now();

        let mut position = 0;
        while position < inner.backlog.len() {
            let id = inner.backlog[position].clone();
            let status = inner
                .tasks
                .get(&id)
                .map(|t| (t.state, t.is_claimable(now)));

            match status {
                None => {
                    inner.backlog.remove(position);
                }
                // Cancelled while queued; drop the backlog entry.
                Some((state, _)) if state != TaskState::Pending => {
                    inner.backlog.remove(position);
                }
                // Still in its backoff window; keep FIFO order.
                Some((_, false)) => {
                    position += 1;
                }
                Some((_, true)) => {
                    inner.backlog.remove(position);
                    let task = inner.tasks.get(&id).cloned().expect("task just observed");
                    let claimed = task.start();
                    inner.tasks.insert(id, claimed.clone());
                    return Ok(Some(claimed));
                }
            }
        }

        Ok(None)
    }

    async fn update_progress(&self, id: &TaskId, progress: f32) -> TaskStoreResult<()> {
        self.with_task(id, |_, task| {
            if task.state.is_terminal() {
                return Err(TaskStoreError::Terminal(task.state));
            }
            if task.state != TaskState::Processing {
                return Err(TaskStoreError::NotProcessing(task.state));
            }
            let progress = progress.clamp(0.0, 100.0);
            if progress > task.progress {
                task.progress = progress;
                task.updated_at = Utc::now();
            }
            Ok(())
        })
    }

    async fn complete(&self, id: &TaskId, output: String) -> TaskStoreResult<()> {
        self.with_task(id, |_, task| {
            Self::guard_transition(task, TaskState::Completed)?;
            *task = task.clone().complete(output);
            Ok(())
        })
    }

    async fn fail(&self, id: &TaskId, error: String) -> TaskStoreResult<()> {
        self.with_task(id, |_, task| {
            Self::guard_transition(task, TaskState::Failed)?;
            *task = task.clone().fail(non_empty_error(error));
            Ok(())
        })
    }

    async fn requeue(
        &self,
        id: &TaskId,
        next_attempt_at: DateTime<Utc>,
    ) -> TaskStoreResult<()> {
        self.with_task(id, |inner, task| {
            Self::guard_transition(task, TaskState::Pending)?;
            *task = task.clone().requeue(next_attempt_at);
            inner.backlog.push_back(task.id.as_str().to_string());
            Ok(())
        })
    }

    async fn cancel(&self, id: &TaskId) -> TaskStoreResult<bool> {
        self.with_task(id, |_, task| {
            if !task.state.can_transition_to(TaskState::Cancelled) {
                return Ok(false);
            }
            *task = task.clone().cancel();
            Ok(true)
        })
    }

    async fn append_log(&self, entry: OperationLogEntry) -> TaskStoreResult<()> {
        let mut inner = self.inner.lock().expect("repository lock poisoned");
        inner.logs.push(entry);
        Ok(())
    }

    async fn log_entries(&self, id: &TaskId) -> TaskStoreResult<Vec<OperationLogEntry>> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        Ok(inner
            .logs
            .iter()
            .filter(|e| e.task_id == *id)
            .cloned()
            .collect())
    }
}
