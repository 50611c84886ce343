//! Task dispatcher.
//!
//! Claims one pending task per free worker slot and runs each claim on its
//! own tokio task. The semaphore bounds concurrency to the configured
//! engine capacity; long-running stages only ever hold their own slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn};

use mixcut_media::{sweep_orphaned, StageEngine};
use mixcut_storage::StorageGateway;
use mixcut_tasks::TaskRepository;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::processor::{run_task, ProcessingContext};

/// Claim loop driving the worker pool.
pub struct Dispatcher {
    ctx: Arc<ProcessingContext>,
    semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl Dispatcher {
    pub fn new(
        config: WorkerConfig,
        repo: Arc<dyn TaskRepository>,
        storage: Arc<dyn StorageGateway>,
        engine: Arc<dyn StageEngine>,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_tasks));
        let (shutdown, _) = watch::channel(false);
        let ctx = Arc::new(ProcessingContext::new(config, repo, storage, engine));

        Self {
            ctx,
            semaphore,
            shutdown,
        }
    }

    /// Run until shutdown, then drain in-flight tasks.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting dispatcher with {} worker slot(s)",
            self.ctx.config.max_concurrent_tasks
        );

        // Reclaim scratch space left by crashed runs.
        match sweep_orphaned(&self.ctx.config.work_dir).await {
            Ok(0) => {}
            Ok(n) => info!("Swept {} orphaned task workspace(s)", n),
            Err(e) => warn!("Workspace sweep failed: {}", e),
        }

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping dispatcher");
                        break;
                    }
                }
                result = self.claim_cycle() => {
                    if let Err(e) = result {
                        error!("Error claiming tasks: {}", e);
                        // Back off on repository errors
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        info!("Waiting for in-flight tasks to complete...");
        let _ = tokio::time::timeout(self.ctx.config.shutdown_timeout, self.wait_for_drain()).await;

        info!("Dispatcher stopped");
        Ok(())
    }

    /// Claim at most one task if a worker slot is free.
    async fn claim_cycle(&self) -> WorkerResult<()> {
        if self.semaphore.available_permits() == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        match self.ctx.repo.claim_next().await? {
            Some(task) => {
                let permit = Arc::clone(&self.semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|_| WorkerError::Config("worker pool closed".into()))?;
                let ctx = Arc::clone(&self.ctx);

                tokio::spawn(async move {
                    let _permit = permit;
                    run_task(ctx, task).await;
                });
            }
            None => {
                tokio::time::sleep(self.ctx.config.poll_interval).await;
            }
        }

        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait until every worker slot is free again.
    async fn wait_for_drain(&self) {
        loop {
            if self.semaphore.available_permits() == self.ctx.config.max_concurrent_tasks {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
