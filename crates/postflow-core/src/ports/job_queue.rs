//! Job queue port - abstraction over job queue backends.
//!
//! A job moves through `scheduled -> pending -> processing -> completed | failed`.
//! Jobs enqueued with a delay stay scheduled until `scheduled_at`, and a
//! backend must never hand a job to its handler before then. Delivery is
//! at-least-once, so handlers have to tolerate running twice.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job that can be queued and processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: String,
    /// Queue label, used for grouping and logging.
    pub queue: String,
    /// Name of the registered handler that runs this job.
    pub handler: String,
    /// Arguments, keyed by name.
    pub payload: serde_json::Value,
    /// Number of attempts made so far.
    pub attempts: u32,
    /// Maximum attempts before the job is marked failed.
    pub max_attempts: u32,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// Earliest time the job may run. `None` means immediately.
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        queue: impl Into<String>,
        handler: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            queue: queue.into(),
            handler: handler.into(),
            payload,
            attempts: 0,
            max_attempts: 3,
            created_at: Utc::now(),
            scheduled_at: None,
        }
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn delayed(mut self, delay: chrono::Duration) -> Self {
        self.scheduled_at = Some(self.created_at + delay);
        self
    }

    /// Whether the job may be dispatched at `now`.
    pub fn is_eligible_at(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at.is_none_or(|at| at <= now)
    }

    /// Time left until the job becomes eligible, if any.
    pub fn remaining_delay(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        self.scheduled_at
            .and_then(|at| (at - now).to_std().ok())
            .filter(|d| !d.is_zero())
    }
}

/// Result of job processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    /// Job completed successfully.
    Success,
    /// Job failed, should be retried.
    Retry(String),
    /// Job failed permanently, should not be retried.
    Failed(String),
}

/// Job handler function type.
pub type JobHandler =
    Arc<dyn Fn(Job) -> Pin<Box<dyn Future<Output = JobResult> + Send>> + Send + Sync>;

/// Wrap an async closure as a [`JobHandler`].
pub fn job_handler<F, Fut>(f: F) -> JobHandler
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobResult> + Send + 'static,
{
    Arc::new(move |job| Box::pin(f(job)))
}

/// Job queue trait - abstraction over job queue backends.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Map a handler name to the function that runs its jobs.
    async fn register(&self, name: &str, handler: JobHandler) -> Result<(), JobQueueError>;

    /// Enqueue a job. Returns once the job is stored; never waits for it to run.
    async fn enqueue(&self, job: Job) -> Result<(), JobQueueError>;

    /// Start the worker tasks that dispatch jobs to registered handlers.
    async fn start(&self) -> Result<(), JobQueueError>;

    /// Get queue statistics.
    async fn stats(&self) -> Result<QueueStats, JobQueueError>;
}

/// Queue statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Delayed jobs not yet eligible.
    pub scheduled: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Job queue errors.
#[derive(Debug, thiserror::Error)]
pub enum JobQueueError {
    #[error("Failed to enqueue job: {0}")]
    EnqueueError(String),

    #[error("Queue is full")]
    QueueFull,

    #[error("Handler already registered: {0}")]
    DuplicateHandler(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_eligible_immediately() {
        let job = Job::new("default", "noop", serde_json::json!({}));
        assert!(job.is_eligible_at(Utc::now()));
        assert!(job.remaining_delay(Utc::now()).is_none());
    }

    #[test]
    fn test_delayed_job_waits() {
        let job = Job::new("tweet", "send_tweet", serde_json::json!({}))
            .delayed(chrono::Duration::seconds(15));

        assert!(!job.is_eligible_at(job.created_at));
        assert!(job.is_eligible_at(job.created_at + chrono::Duration::seconds(15)));

        let remaining = job.remaining_delay(job.created_at).unwrap();
        assert_eq!(remaining, std::time::Duration::from_secs(15));
        assert!(
            job.remaining_delay(job.created_at + chrono::Duration::seconds(20))
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_job_handler_wraps_closure() {
        let handler = job_handler(|job: Job| async move {
            if job.handler == "ok" {
                JobResult::Success
            } else {
                JobResult::Failed("nope".to_string())
            }
        });

        let ok = handler(Job::new("q", "ok", serde_json::Value::Null)).await;
        let failed = handler(Job::new("q", "other", serde_json::Value::Null)).await;

        assert_eq!(ok, JobResult::Success);
        assert_eq!(failed, JobResult::Failed("nope".to_string()));
    }
}
