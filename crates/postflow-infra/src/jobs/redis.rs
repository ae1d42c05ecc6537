//! Redis job queue implementation.
//!
//! Eligible jobs live in a LIST (`<queue>:pending`) consumed with BLPOP.
//! Delayed jobs wait in a sorted set (`<queue>:scheduled`) scored by the
//! millisecond timestamp at which they become eligible; workers move due
//! entries onto the list between pops.
//!
//! Each worker owns its connection. BLPOP holds a connection until it
//! returns, so `enqueue` and `stats` use a separate one.

use std::sync::{Arc, LazyLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult, Script};

use postflow_core::ports::{Job, JobHandler, JobQueue, JobQueueError, JobResult, QueueStats};

use super::dispatch::{HandlerRegistry, JobStats};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        }
    }
}

/// Redis job queue configuration.
#[derive(Debug, Clone)]
pub struct RedisJobQueueConfig {
    /// Redis connection config
    pub redis: RedisConfig,
    /// Queue name/key prefix
    pub queue_name: String,
    /// Number of worker consumers
    pub workers: usize,
    /// Timeout for blocking pop (seconds). Also bounds how late a delayed
    /// job can be promoted.
    pub pop_timeout: u64,
}

impl Default for RedisJobQueueConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            queue_name: "jobs".to_string(),
            workers: 4,
            pop_timeout: 1,
        }
    }
}

impl RedisJobQueueConfig {
    pub fn from_env() -> Self {
        Self {
            redis: RedisConfig::from_env(),
            queue_name: std::env::var("JOB_QUEUE_NAME").unwrap_or_else(|_| "jobs".to_string()),
            workers: std::env::var("JOB_QUEUE_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            pop_timeout: std::env::var("JOB_QUEUE_POP_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
        }
    }
}

/// Redis-backed job queue.
pub struct RedisJobQueue {
    client: Client,
    /// Shared by `enqueue` and `stats`; never used for blocking commands.
    conn: ConnectionManager,
    config: RedisJobQueueConfig,
    registry: HandlerRegistry,
    stats: Arc<JobStats>,
    running: Arc<AtomicBool>,
}

impl RedisJobQueue {
    pub async fn new(config: RedisJobQueueConfig) -> Result<Self, JobQueueError> {
        let client = Client::open(config.redis.url.as_str())
            .map_err(|e| JobQueueError::Backend(e.to_string()))?;

        let conn = connect(&client, config.redis.connect_timeout).await?;

        tracing::info!(
            url = %config.redis.url,
            queue = %config.queue_name,
            workers = config.workers,
            "Connected to Redis job queue"
        );

        Ok(Self {
            client,
            conn,
            config,
            registry: HandlerRegistry::default(),
            stats: Arc::new(JobStats::default()),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, JobQueueError> {
        Self::new(RedisJobQueueConfig::from_env()).await
    }

    /// Ask workers to exit after their current pop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn pending_key(&self) -> String {
        format!("{}:pending", self.config.queue_name)
    }

    fn scheduled_key(&self) -> String {
        format!("{}:scheduled", self.config.queue_name)
    }
}

/// Open a connection, giving up after `timeout` if Redis is unreachable.
async fn connect(
    client: &Client,
    timeout: Duration,
) -> Result<ConnectionManager, JobQueueError> {
    tokio::time::timeout(timeout, ConnectionManager::new(client.clone()))
        .await
        .map_err(|_| JobQueueError::Backend("Connection timed out".to_string()))?
        .map_err(|e| JobQueueError::Backend(e.to_string()))
}

/// KEYS[1] scheduled set, KEYS[2] pending list, ARGV[1] now in ms.
/// Runs as one script, so a due job is never removed without being pushed
/// and concurrent workers promote it once.
static PROMOTE_DUE: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, 100)
        for _, job in ipairs(due) do
            redis.call('ZREM', KEYS[1], job)
            redis.call('RPUSH', KEYS[2], job)
        end
        return #due
        ",
    )
});

/// Move due jobs from the scheduled set onto the pending list.
async fn promote_due(
    conn: &mut ConnectionManager,
    scheduled_key: &str,
    pending_key: &str,
) -> RedisResult<usize> {
    let promoted: usize = PROMOTE_DUE
        .key(scheduled_key)
        .key(pending_key)
        .arg(Utc::now().timestamp_millis())
        .invoke_async(conn)
        .await?;
    Ok(promoted)
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn register(&self, name: &str, handler: JobHandler) -> Result<(), JobQueueError> {
        self.registry.register(name, handler).await
    }

    async fn enqueue(&self, job: Job) -> Result<(), JobQueueError> {
        let mut conn = self.conn.clone();
        let job_json =
            serde_json::to_string(&job).map_err(|e| JobQueueError::EnqueueError(e.to_string()))?;

        match job.scheduled_at.filter(|at| *at > Utc::now()) {
            Some(at) => {
                let _: () = conn
                    .zadd(self.scheduled_key(), &job_json, at.timestamp_millis())
                    .await
                    .map_err(|e| JobQueueError::Backend(e.to_string()))?;
                tracing::debug!(
                    job_id = %job.id,
                    handler = %job.handler,
                    scheduled_at = %at,
                    "Job scheduled"
                );
            }
            None => {
                let _: () = conn
                    .rpush(self.pending_key(), &job_json)
                    .await
                    .map_err(|e| JobQueueError::Backend(e.to_string()))?;
                tracing::debug!(job_id = %job.id, handler = %job.handler, "Job enqueued");
            }
        }

        Ok(())
    }

    async fn start(&self) -> Result<(), JobQueueError> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Job workers already started");
            return Ok(());
        }

        let mut worker_conns = Vec::with_capacity(self.config.workers);
        for _ in 0..self.config.workers {
            match connect(&self.client, self.config.redis.connect_timeout).await {
                Ok(conn) => worker_conns.push(conn),
                Err(e) => {
                    self.running.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }

        for (worker_id, mut conn) in worker_conns.into_iter().enumerate() {
            let pending_key = self.pending_key();
            let scheduled_key = self.scheduled_key();
            let stats = self.stats.clone();
            let running = self.running.clone();
            let registry = self.registry.clone();
            let pop_timeout = self.config.pop_timeout;
            let queue_name = self.config.queue_name.clone();

            tokio::spawn(async move {
                tracing::info!(
                    worker_id = worker_id,
                    queue = %queue_name,
                    "Job queue worker started"
                );

                loop {
                    if !running.load(Ordering::SeqCst) {
                        tracing::info!(worker_id = worker_id, "Worker stopping");
                        break;
                    }

                    match promote_due(&mut conn, &scheduled_key, &pending_key).await {
                        Ok(0) => {}
                        Ok(n) => tracing::debug!(count = n, "Promoted scheduled jobs"),
                        Err(e) => tracing::error!(error = %e, "Failed to promote scheduled jobs"),
                    }

                    // Blocking pop with timeout
                    let result: RedisResult<Option<(String, String)>> =
                        conn.blpop(&pending_key, pop_timeout as f64).await;

                    let job_json = match result {
                        Ok(Some((_, json))) => json,
                        Ok(None) => continue, // Timeout, loop again
                        Err(e) => {
                            tracing::error!(error = %e, "Redis BLPOP error");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                            continue;
                        }
                    };

                    let mut job: Job = match serde_json::from_str(&job_json) {
                        Ok(j) => j,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to deserialize job");
                            JobStats::incr(&stats.failed);
                            continue;
                        }
                    };

                    JobStats::incr(&stats.processing);
                    job.attempts += 1;

                    tracing::debug!(
                        worker_id = worker_id,
                        job_id = %job.id,
                        queue = %job.queue,
                        handler = %job.handler,
                        attempt = job.attempts,
                        "Processing job"
                    );

                    let result = registry.dispatch(job.clone()).await;
                    JobStats::decr(&stats.processing);

                    match result {
                        JobResult::Success => {
                            JobStats::incr(&stats.completed);
                            tracing::debug!(job_id = %job.id, "Job completed successfully");
                        }
                        JobResult::Retry(reason) if job.attempts < job.max_attempts => {
                            let requeued = match serde_json::to_string(&job) {
                                Ok(json) => conn
                                    .rpush::<_, _, ()>(&pending_key, &json)
                                    .await
                                    .map_err(|e| e.to_string()),
                                Err(e) => Err(e.to_string()),
                            };
                            match requeued {
                                Ok(()) => tracing::warn!(
                                    job_id = %job.id,
                                    attempt = job.attempts,
                                    reason = %reason,
                                    "Job queued for retry"
                                ),
                                Err(e) => {
                                    JobStats::incr(&stats.failed);
                                    tracing::error!(
                                        error = %e,
                                        "Failed to re-enqueue job for retry"
                                    );
                                }
                            }
                        }
                        JobResult::Retry(reason) => {
                            JobStats::incr(&stats.failed);
                            tracing::error!(
                                job_id = %job.id,
                                reason = %reason,
                                "Job failed after max retries"
                            );
                        }
                        JobResult::Failed(reason) => {
                            JobStats::incr(&stats.failed);
                            tracing::error!(job_id = %job.id, reason = %reason, "Job failed");
                        }
                    }
                }
            });
        }

        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, JobQueueError> {
        let mut conn = self.conn.clone();
        let pending: usize = conn
            .llen(self.pending_key())
            .await
            .map_err(|e| JobQueueError::Backend(e.to_string()))?;
        let scheduled: usize = conn
            .zcard(self.scheduled_key())
            .await
            .map_err(|e| JobQueueError::Backend(e.to_string()))?;

        Ok(QueueStats {
            scheduled,
            pending,
            processing: JobStats::get(&self.stats.processing),
            completed: JobStats::get(&self.stats.completed),
            failed: JobStats::get(&self.stats.failed),
        })
    }
}
