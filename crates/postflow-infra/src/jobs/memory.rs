//! In-memory job queue implementation.
//!
//! This is the fallback when Redis is not available.
//! Jobs are stored in memory and processed by local workers; delayed jobs
//! wait on a timer task until they become eligible.
//! Note: Jobs are lost on server restart.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, mpsc};

use postflow_core::ports::{Job, JobHandler, JobQueue, JobQueueError, JobResult, QueueStats};

use super::dispatch::{HandlerRegistry, JobStats};

/// In-memory job queue configuration.
#[derive(Debug, Clone)]
pub struct InMemoryJobQueueConfig {
    /// Maximum number of waiting jobs, scheduled or pending (0 = unlimited).
    pub max_size: usize,
    /// Number of worker tasks.
    pub workers: usize,
}

impl Default for InMemoryJobQueueConfig {
    fn default() -> Self {
        Self {
            max_size: 10000,
            workers: 4,
        }
    }
}

impl InMemoryJobQueueConfig {
    pub fn from_env() -> Self {
        Self {
            max_size: std::env::var("JOB_QUEUE_MAX_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10000),
            workers: std::env::var("JOB_QUEUE_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
        }
    }
}

/// In-memory job queue.
pub struct InMemoryJobQueue {
    stats: Arc<JobStats>,
    config: InMemoryJobQueueConfig,
    registry: HandlerRegistry,
    job_sender: mpsc::UnboundedSender<Job>,
    job_receiver: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    started: AtomicBool,
}

impl InMemoryJobQueue {
    pub fn new(config: InMemoryJobQueueConfig) -> Self {
        // Capacity is enforced in `enqueue` against the counters, so a
        // `max_size` of 0 really is unlimited.
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            stats: Arc::new(JobStats::default()),
            config,
            registry: HandlerRegistry::default(),
            job_sender: tx,
            job_receiver: Arc::new(Mutex::new(rx)),
            started: AtomicBool::new(false),
        }
    }

    pub fn from_env() -> Self {
        Self::new(InMemoryJobQueueConfig::from_env())
    }

    /// Park a delayed job until it is eligible, then hand it to the workers.
    fn schedule(&self, job: Job, delay: std::time::Duration) {
        let sender = self.job_sender.clone();
        let stats = self.stats.clone();
        JobStats::incr(&stats.scheduled);

        tracing::debug!(
            job_id = %job.id,
            handler = %job.handler,
            delay_ms = delay.as_millis() as u64,
            "Job scheduled"
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            JobStats::decr(&stats.scheduled);
            JobStats::incr(&stats.pending);
            tracing::debug!(job_id = %job.id, "Job eligible");
            if let Err(e) = sender.send(job) {
                JobStats::decr(&stats.pending);
                tracing::error!("Failed to release scheduled job: {}", e);
            }
        });
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn register(&self, name: &str, handler: JobHandler) -> Result<(), JobQueueError> {
        self.registry.register(name, handler).await
    }

    async fn enqueue(&self, job: Job) -> Result<(), JobQueueError> {
        if self.config.max_size > 0 {
            let waiting = JobStats::get(&self.stats.pending) + JobStats::get(&self.stats.scheduled);
            if waiting >= self.config.max_size {
                return Err(JobQueueError::QueueFull);
            }
        }

        if let Some(delay) = job.remaining_delay(Utc::now()) {
            self.schedule(job, delay);
            return Ok(());
        }

        JobStats::incr(&self.stats.pending);
        if self.job_sender.send(job).is_err() {
            JobStats::decr(&self.stats.pending);
            return Err(JobQueueError::EnqueueError("queue closed".to_string()));
        }

        tracing::debug!(
            "Job enqueued. Queue size: {}",
            JobStats::get(&self.stats.pending)
        );

        Ok(())
    }

    async fn start(&self) -> Result<(), JobQueueError> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("Job workers already started");
            return Ok(());
        }

        for worker_id in 0..self.config.workers {
            let registry = self.registry.clone();
            let receiver = self.job_receiver.clone();
            let stats = self.stats.clone();
            let sender = self.job_sender.clone();

            tokio::spawn(async move {
                tracing::info!("Job worker {} started", worker_id);

                loop {
                    let job = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };

                    let Some(mut job) = job else {
                        tracing::info!("Job worker {} shutting down", worker_id);
                        break;
                    };

                    JobStats::decr(&stats.pending);
                    JobStats::incr(&stats.processing);

                    tracing::debug!(
                        worker = worker_id,
                        job_id = %job.id,
                        queue = %job.queue,
                        handler = %job.handler,
                        "Processing job"
                    );

                    job.attempts += 1;
                    let result = registry.dispatch(job.clone()).await;

                    JobStats::decr(&stats.processing);

                    match result {
                        JobResult::Success => {
                            JobStats::incr(&stats.completed);
                            tracing::debug!(job_id = %job.id, "Job completed successfully");
                        }
                        JobResult::Retry(reason) if job.attempts < job.max_attempts => {
                            tracing::warn!(
                                job_id = %job.id,
                                attempt = job.attempts,
                                max_attempts = job.max_attempts,
                                reason = %reason,
                                "Job failed, will retry"
                            );
                            // Back off a little before the job is visible again
                            JobStats::incr(&stats.pending);
                            let sender = sender.clone();
                            let stats = stats.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(std::time::Duration::from_millis(
                                    100 * job.attempts as u64,
                                ))
                                .await;
                                if let Err(e) = sender.send(job) {
                                    JobStats::decr(&stats.pending);
                                    tracing::error!("Failed to re-enqueue job for retry: {}", e);
                                }
                            });
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
                            tracing::error!(
                                job_id = %job.id,
                                reason = %reason,
                                "Job failed permanently"
                            );
                        }
                    }
                }
            });
        }

        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, JobQueueError> {
        Ok(QueueStats {
            scheduled: JobStats::get(&self.stats.scheduled),
            pending: JobStats::get(&self.stats.pending),
            processing: JobStats::get(&self.stats.processing),
            completed: JobStats::get(&self.stats.completed),
            failed: JobStats::get(&self.stats.failed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    use postflow_core::ports::job_handler;

    fn queue() -> InMemoryJobQueue {
        InMemoryJobQueue::new(InMemoryJobQueueConfig {
            max_size: 10,
            workers: 2,
        })
    }

    async fn wait_for<F>(queue: &InMemoryJobQueue, done: F) -> QueueStats
    where
        F: Fn(&QueueStats) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                let stats = queue.stats().await.unwrap();
                if done(&stats) {
                    return stats;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("queue did not settle")
    }

    #[tokio::test]
    async fn test_registered_handler_receives_payload() {
        let queue = queue();
        let (tx, mut rx) = mpsc::channel(1);

        queue
            .register(
                "echo",
                job_handler(move |job: Job| {
                    let tx = tx.clone();
                    async move {
                        tx.send(job.payload).await.unwrap();
                        JobResult::Success
                    }
                }),
            )
            .await
            .unwrap();
        queue.start().await.unwrap();

        let payload = serde_json::json!({"post_id": "abc"});
        queue
            .enqueue(Job::new("default", "echo", payload.clone()))
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(received.unwrap(), payload);

        let stats = wait_for(&queue, |s| s.completed == 1).await;
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_job_not_dispatched_early() {
        let queue = queue();
        let (tx, mut rx) = mpsc::channel(1);

        queue
            .register(
                "later",
                job_handler(move |_job: Job| {
                    let tx = tx.clone();
                    async move {
                        tx.send(tokio::time::Instant::now()).await.unwrap();
                        JobResult::Success
                    }
                }),
            )
            .await
            .unwrap();
        queue.start().await.unwrap();

        let enqueued_at = tokio::time::Instant::now();
        queue
            .enqueue(
                Job::new("default", "later", serde_json::Value::Null)
                    .delayed(chrono::Duration::seconds(15)),
            )
            .await
            .unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.pending, 0);

        let ran_at = rx.recv().await.unwrap();
        assert!(ran_at - enqueued_at >= Duration::from_secs(14));
    }

    #[tokio::test]
    async fn test_unknown_handler_fails_without_retry() {
        let queue = queue();
        queue.start().await.unwrap();

        queue
            .enqueue(Job::new("default", "nobody", serde_json::Value::Null))
            .await
            .unwrap();

        let stats = wait_for(&queue, |s| s.failed == 1).await;
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_retry_stops_at_max_attempts() {
        let queue = queue();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        queue
            .register(
                "flaky",
                job_handler(move |_job: Job| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        JobResult::Retry("upstream down".to_string())
                    }
                }),
            )
            .await
            .unwrap();
        queue.start().await.unwrap();

        queue
            .enqueue(Job::new("default", "flaky", serde_json::Value::Null).with_max_attempts(2))
            .await
            .unwrap();

        wait_for(&queue, |s| s.failed == 1).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_enqueue_rejects_when_full() {
        let queue = InMemoryJobQueue::new(InMemoryJobQueueConfig {
            max_size: 1,
            workers: 1,
        });

        queue
            .enqueue(Job::new("default", "noop", serde_json::Value::Null))
            .await
            .unwrap();
        let err = queue
            .enqueue(Job::new("default", "noop", serde_json::Value::Null))
            .await
            .unwrap_err();

        assert!(matches!(err, JobQueueError::QueueFull));
    }

    #[tokio::test]
    async fn test_zero_max_size_is_unbounded() {
        let queue = InMemoryJobQueue::new(InMemoryJobQueueConfig {
            max_size: 0,
            workers: 1,
        });

        for _ in 0..150 {
            queue
                .enqueue(Job::new("default", "noop", serde_json::Value::Null))
                .await
                .unwrap();
        }

        assert_eq!(queue.stats().await.unwrap().pending, 150);
    }
}
