//! Per-task processing pipeline.
//!
//! A claimed task flows through: scratch workspace -> input fetch ->
//! probe -> filter compilation -> stage-by-stage engine execution ->
//! output upload -> finalization. Each stage feeds the next stage's input;
//! a failure at stage k leaves the log entries for stages 1..k and never
//! runs the rest.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use mixcut_filters::{compile, FilterStage, FrameSpec};
use mixcut_media::{ProgressCallback, ScratchWorkspace, StageContext, StageEngine};
use mixcut_models::{OperationLogEntry, Task, TaskId, TaskState};
use mixcut_storage::StorageGateway;
use mixcut_tasks::{ProgressReporter, TaskRepository};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::TaskLogger;
use crate::retry::{backoff_delay, retry_async, RetryConfig};

/// Shared collaborators for task processing.
pub struct ProcessingContext {
    pub repo: Arc<dyn TaskRepository>,
    pub storage: Arc<dyn StorageGateway>,
    pub engine: Arc<dyn StageEngine>,
    pub reporter: ProgressReporter,
    pub config: WorkerConfig,
}

impl ProcessingContext {
    pub fn new(
        config: WorkerConfig,
        repo: Arc<dyn TaskRepository>,
        storage: Arc<dyn StorageGateway>,
        engine: Arc<dyn StageEngine>,
    ) -> Self {
        Self {
            reporter: ProgressReporter::new(Arc::clone(&repo)),
            repo,
            storage,
            engine,
            config,
        }
    }
}

/// Run one claimed task to a terminal state or a requeue.
pub async fn run_task(ctx: Arc<ProcessingContext>, task: Task) {
    let logger = TaskLogger::new(&task.id, task.operation.as_str());
    logger.start(&format!("{} input(s)", task.inputs.len()));

    let scratch = match ScratchWorkspace::create(&ctx.config.work_dir, task.id.as_str()).await {
        Ok(ws) => ws,
        Err(e) => {
            finalize(&ctx, &task, Err(WorkerError::from(e)), &logger).await;
            return;
        }
    };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let watcher = spawn_cancel_watcher(Arc::clone(&ctx), task.id.clone(), cancel_tx);

    let outcome = execute(&ctx, &task, &scratch, cancel_rx, &logger).await;

    watcher.abort();
    scratch.release().await;

    finalize(&ctx, &task, outcome, &logger).await;
}

/// Watch the task record and flip the cancel signal when a cancellation
/// request lands. The record is the source of truth, so cancellations from
/// any process reach the in-flight engine.
fn spawn_cancel_watcher(
    ctx: Arc<ProcessingContext>,
    id: TaskId,
    cancel_tx: watch::Sender<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(ctx.config.cancel_poll_interval).await;
            match ctx.repo.get(&id).await {
                Ok(Some(task)) if task.state == TaskState::Cancelled => {
                    let _ = cancel_tx.send(true);
                    break;
                }
                Ok(Some(task)) if task.state.is_terminal() => break,
                Ok(None) => break,
                _ => {}
            }
        }
    })
}

async fn execute(
    ctx: &ProcessingContext,
    task: &Task,
    scratch: &ScratchWorkspace,
    cancel_rx: watch::Receiver<bool>,
    logger: &TaskLogger,
) -> WorkerResult<String> {
    // Resolve every input reference into the scratch workspace.
    let mut local_inputs = Vec::with_capacity(task.inputs.len());
    for (index, reference) in task.inputs.iter().enumerate() {
        let ext = Path::new(reference)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let dest = scratch.file(&format!("input_{}.{}", index, ext));

        let retry = RetryConfig::new(format!("fetch {}", reference))
            .with_max_retries(ctx.config.storage_retries);
        retry_async(&retry, || ctx.storage.fetch(reference, &dest)).await?;
        local_inputs.push(dest);
    }
    logger.progress("inputs resolved");

    let info = ctx.engine.probe(&local_inputs[0]).await?;
    let frame = FrameSpec::new(info.width, info.height);

    let stages = compile(&task.config, frame, task.inputs.len());
    logger.progress(&format!("compiled {} stage(s)", stages.len()));

    // Bridge sync engine progress callbacks into async reporter writes.
    let (progress_tx, mut progress_rx) = watch::channel(0.0f32);
    let forwarder = {
        let repo = Arc::clone(&ctx.repo);
        let id = task.id.clone();
        tokio::spawn(async move {
            let reporter = ProgressReporter::new(repo);
            while progress_rx.changed().await.is_ok() {
                let pct = *progress_rx.borrow();
                reporter.report(&id, pct).await.ok();
            }
        })
    };

    let result = run_stages(
        ctx,
        task,
        &stages,
        &local_inputs,
        scratch,
        cancel_rx,
        progress_tx,
    )
    .await;

    forwarder.abort();
    result
}

async fn run_stages(
    ctx: &ProcessingContext,
    task: &Task,
    stages: &[FilterStage],
    local_inputs: &[PathBuf],
    scratch: &ScratchWorkspace,
    cancel_rx: watch::Receiver<bool>,
    progress_tx: watch::Sender<f32>,
) -> WorkerResult<String> {
    let stage_count = stages.len();
    let mut current = local_inputs[0].clone();

    for (index, stage) in stages.iter().enumerate() {
        if *cancel_rx.borrow() {
            return Err(WorkerError::Cancelled);
        }

        let output = scratch.file(&format!("stage_{}.mp4", index));
        let on_progress: ProgressCallback = {
            let tx = progress_tx.clone();
            Arc::new(move |pct| {
                let _ = tx.send(ProgressReporter::stage_progress(index, stage_count, pct));
            })
        };

        let stage_ctx = StageContext {
            inputs: local_inputs.to_vec(),
            current: current.clone(),
            output: output.clone(),
            scratch: scratch.dir().to_path_buf(),
            cancel: cancel_rx.clone(),
            on_progress: Some(on_progress),
        };

        let started = Instant::now();
        match ctx.engine.execute_stage(stage, &stage_ctx).await {
            Ok(()) => {
                ctx.repo
                    .append_log(OperationLogEntry::success(
                        task.id.clone(),
                        index as u32,
                        stage.kind.as_str(),
                        started.elapsed().as_millis() as u64,
                    ))
                    .await
                    .ok();
                current = output;
            }
            Err(e) => {
                ctx.repo
                    .append_log(OperationLogEntry::failure(
                        task.id.clone(),
                        index as u32,
                        stage.kind.as_str(),
                        started.elapsed().as_millis() as u64,
                        e.to_string(),
                    ))
                    .await
                    .ok();
                return Err(e.into());
            }
        }
    }

    if *cancel_rx.borrow() {
        return Err(WorkerError::Cancelled);
    }

    let retry = RetryConfig::new("store output").with_max_retries(ctx.config.storage_retries);
    let reference = retry_async(&retry, || ctx.storage.store(&current)).await?;
    Ok(reference)
}

/// Apply the outcome to the task record.
async fn finalize(
    ctx: &ProcessingContext,
    task: &Task,
    outcome: WorkerResult<String>,
    logger: &TaskLogger,
) {
    match outcome {
        Ok(reference) => match ctx.reporter.complete(&task.id, &reference).await {
            Ok(()) => logger.completion(&reference),
            // A cancellation can land between the last stage and here; the
            // terminal record wins and the produced output is discarded.
            Err(e) => logger.warning(&format!("result discarded: {}", e)),
        },
        Err(e) if e.is_cancelled() => {
            logger.progress("cancelled, partial output discarded");
        }
        Err(e) if e.is_retryable() && task.can_retry() => {
            let delay = backoff_delay(
                ctx.config.retry_base_delay,
                ctx.config.retry_max_delay,
                task.retry_count,
            );
            let next_attempt_at = Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
            match ctx.repo.requeue(&task.id, next_attempt_at).await {
                Ok(()) => logger.warning(&format!(
                    "requeued after transient failure (attempt {}): {}",
                    task.retry_count + 1,
                    e
                )),
                Err(store_err) => logger.warning(&format!(
                    "requeue rejected ({}); original error: {}",
                    store_err, e
                )),
            }
        }
        Err(e) => match ctx.reporter.fail(&task.id, e.to_string()).await {
            Ok(()) => logger.failure(&e.to_string()),
            Err(store_err) => logger.warning(&format!(
                "failure not recorded ({}); original error: {}",
                store_err, e
            )),
        },
    }
}
