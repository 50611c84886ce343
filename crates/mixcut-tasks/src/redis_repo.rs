//! Redis-backed task repository.
//!
//! Task records are JSON values under `mixcut:task:{id}`; the pending
//! backlog is a Redis stream consumed through a consumer group, which makes
//! claim delivery exclusive: each stream entry reaches exactly one
//! consumer. Operation logs are per-task lists.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use async_trait::async_trait;

use mixcut_models::{OperationLogEntry, Task, TaskId, TaskState};

use crate::error::{TaskStoreError, TaskStoreResult};
use crate::repository::{non_empty_error, TaskRepository};

/// Repository configuration.
#[derive(Debug, Clone)]
pub struct RedisRepoConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for the pending backlog
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// This worker's consumer name
    pub consumer_name: String,
}

impl Default for RedisRepoConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "mixcut:backlog".to_string(),
            consumer_group: "mixcut:workers".to_string(),
            consumer_name: format!("worker-{}", std::process::id()),
        }
    }
}

impl RedisRepoConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("BACKLOG_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("BACKLOG_CONSUMER_GROUP")
                .unwrap_or(defaults.consumer_group),
            consumer_name: std::env::var("BACKLOG_CONSUMER_NAME")
                .unwrap_or(defaults.consumer_name),
        }
    }
}

/// Repository backed by Redis.
pub struct RedisRepository {
    client: redis::Client,
    config: RedisRepoConfig,
}

impl RedisRepository {
    /// Create a new repository client.
    pub fn new(config: RedisRepoConfig) -> TaskStoreResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> TaskStoreResult<Self> {
        Self::new(RedisRepoConfig::from_env())
    }

    /// Initialize the backlog (create the consumer group if needed).
    pub async fn init(&self) -> TaskStoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(
                    "Consumer group already exists: {}",
                    self.config.consumer_group
                );
            }
            Err(e) => return Err(TaskStoreError::Redis(e)),
        }

        Ok(())
    }

    fn task_key(id: &TaskId) -> String {
        format!("mixcut:task:{}", id)
    }

    fn log_key(id: &TaskId) -> String {
        format!("mixcut:log:{}", id)
    }

    async fn load_task(
        conn: &mut redis::aio::MultiplexedConnection,
        id: &TaskId,
    ) -> TaskStoreResult<Option<Task>> {
        let payload: Option<String> = conn.get(Self::task_key(id)).await?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_task(
        conn: &mut redis::aio::MultiplexedConnection,
        task: &Task,
    ) -> TaskStoreResult<()> {
        let payload = serde_json::to_string(task)?;
        conn.set::<_, _, ()>(Self::task_key(&task.id), payload).await?;
        Ok(())
    }

    /// Push a task id onto the backlog stream.
    async fn enqueue(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        id: &TaskId,
    ) -> TaskStoreResult<()> {
        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("task_id")
            .arg(id.as_str())
            .query_async(&mut *conn)
            .await?;
        debug!("Enqueued task {} as message {}", id, message_id);
        Ok(())
    }

    /// Acknowledge and delete a backlog entry.
    async fn ack(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        message_id: &str,
    ) -> TaskStoreResult<()> {
        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut *conn)
            .await?;
        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut *conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for RedisRepository {
    async fn insert(&self, task: Task) -> TaskStoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Self::save_task(&mut conn, &task).await?;
        self.enqueue(&mut conn, &task.id).await?;
        info!("Inserted task {}", task.id);
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> TaskStoreResult<Option<Task>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Self::load_task(&mut conn, id).await
    }

    async fn claim_next(&self) -> TaskStoreResult<Option<Task>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let reply: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_name)
            .arg("COUNT")
            .arg(5)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        for stream_key in reply.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();
                let Some(redis::Value::BulkString(raw)) = entry.map.get("task_id") else {
                    warn!("Backlog message {} missing task_id", message_id);
                    self.ack(&mut conn, &message_id).await.ok();
                    continue;
                };
                let id = TaskId::from_string(String::from_utf8_lossy(raw).to_string());

                let Some(task) = Self::load_task(&mut conn, &id).await? else {
                    warn!("Backlog references unknown task {}", id);
                    self.ack(&mut conn, &message_id).await.ok();
                    continue;
                };

                if task.state != TaskState::Pending {
                    // Cancelled while queued.
                    self.ack(&mut conn, &message_id).await?;
                    continue;
                }

                if !task.is_claimable(Utc::now()) {
                    // Backoff window still open; rotate to the stream tail.
                    self.ack(&mut conn, &message_id).await?;
                    self.enqueue(&mut conn, &id).await?;
                    continue;
                }

                let claimed = task.start();
                Self::save_task(&mut conn, &claimed).await?;
                self.ack(&mut conn, &message_id).await?;
                debug!("Claimed task {}", claimed.id);
                return Ok(Some(claimed));
            }
        }

        Ok(None)
    }

    async fn update_progress(&self, id: &TaskId, progress: f32) -> TaskStoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut task = Self::load_task(&mut conn, id)
            .await?
            .ok_or_else(|| TaskStoreError::NotFound(id.clone()))?;

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
            Self::save_task(&mut conn, &task).await?;
        }
        Ok(())
    }

    async fn complete(&self, id: &TaskId, output: String) -> TaskStoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let task = Self::load_task(&mut conn, id)
            .await?
            .ok_or_else(|| TaskStoreError::NotFound(id.clone()))?;

        guard_transition(&task, TaskState::Completed)?;
        Self::save_task(&mut conn, &task.complete(output)).await?;
        Ok(())
    }

    async fn fail(&self, id: &TaskId, error: String) -> TaskStoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let task = Self::load_task(&mut conn, id)
            .await?
            .ok_or_else(|| TaskStoreError::NotFound(id.clone()))?;

        guard_transition(&task, TaskState::Failed)?;
        Self::save_task(&mut conn, &task.fail(non_empty_error(error))).await?;
        Ok(())
    }

    async fn requeue(
        &self,
        id: &TaskId,
        next_attempt_at: DateTime<Utc>,
    ) -> TaskStoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let task = Self::load_task(&mut conn, id)
            .await?
            .ok_or_else(|| TaskStoreError::NotFound(id.clone()))?;

        guard_transition(&task, TaskState::Pending)?;
        let requeued = task.requeue(next_attempt_at);
        Self::save_task(&mut conn, &requeued).await?;
        self.enqueue(&mut conn, id).await?;
        Ok(())
    }

    async fn cancel(&self, id: &TaskId) -> TaskStoreResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let task = Self::load_task(&mut conn, id)
            .await?
            .ok_or_else(|| TaskStoreError::NotFound(id.clone()))?;

        if !task.state.can_transition_to(TaskState::Cancelled) {
            return Ok(false);
        }
        Self::save_task(&mut conn, &task.cancel()).await?;
        info!("Cancelled task {}", id);
        Ok(true)
    }

    async fn append_log(&self, entry: OperationLogEntry) -> TaskStoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(&entry)?;
        conn.rpush::<_, _, ()>(Self::log_key(&entry.task_id), payload)
            .await?;
        Ok(())
    }

    async fn log_entries(&self, id: &TaskId) -> TaskStoreResult<Vec<OperationLogEntry>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Vec<String> = conn.lrange(Self::log_key(id), 0, -1).await?;
        let mut entries = Vec::with_capacity(raw.len());
        for json in raw {
            entries.push(serde_json::from_str(&json)?);
        }
        Ok(entries)
    }
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
