//! Progress and result reporting.
//!
//! All progress/result/error writes from the dispatcher go through the
//! reporter. The repository's state machine supplies the guarantees:
//! progress is monotone and gated on the processing state, terminal tasks
//! reject every write, and result/error are write-once by construction.

use std::sync::Arc;

use tracing::debug;

use mixcut_models::TaskId;

use crate::error::TaskStoreResult;
use crate::repository::TaskRepository;

/// Mediator for task progress and outcome writes.
#[derive(Clone)]
pub struct ProgressReporter {
    repo: Arc<dyn TaskRepository>,
}

impl ProgressReporter {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    /// Map engine progress within one stage onto overall task progress:
    /// stage `index` of `count` spans the `[index, index+1) / count` band.
    pub fn stage_progress(stage_index: usize, stage_count: usize, stage_pct: f32) -> f32 {
        if stage_count == 0 {
            return 0.0;
        }
        let band = 100.0 / stage_count as f32;
        let base = stage_index as f32 * band;
        (base + stage_pct.clamp(0.0, 100.0) / 100.0 * band).clamp(0.0, 100.0)
    }

    /// Record overall progress (clamped to [0, 100]).
    pub async fn report(&self, id: &TaskId, progress: f32) -> TaskStoreResult<()> {
        debug!(task_id = %id, progress, "Progress update");
        self.repo.update_progress(id, progress.clamp(0.0, 100.0)).await
    }

    /// Record a successful outcome with its result reference.
    pub async fn complete(&self, id: &TaskId, output: impl Into<String>) -> TaskStoreResult<()> {
        self.repo.complete(id, output.into()).await
    }

    /// Record a terminal failure.
    pub async fn fail(&self, id: &TaskId, error: impl Into<String>) -> TaskStoreResult<()> {
        self.repo.fail(id, error.into()).await
    }
}
