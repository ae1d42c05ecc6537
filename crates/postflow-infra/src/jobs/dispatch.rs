//! Handler registry and counters shared by the queue backends.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use postflow_core::ports::{Job, JobHandler, JobQueueError, JobResult};

/// Handlers keyed by name. Cloning shares the same map.
#[derive(Clone, Default)]
pub(crate) struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<String, JobHandler>>>,
}

impl HandlerRegistry {
    pub(crate) async fn register(
        &self,
        name: &str,
        handler: JobHandler,
    ) -> Result<(), JobQueueError> {
        let mut handlers = self.handlers.write().await;
        if handlers.contains_key(name) {
            return Err(JobQueueError::DuplicateHandler(name.to_string()));
        }
        handlers.insert(name.to_string(), handler);
        tracing::info!(handler = %name, "Job handler registered");
        Ok(())
    }

    /// Run the handler mapped to `job.handler`. A job nobody handles fails
    /// permanently.
    pub(crate) async fn dispatch(&self, job: Job) -> JobResult {
        let handler = self.handlers.read().await.get(&job.handler).cloned();
        match handler {
            Some(handler) => handler(job).await,
            None => JobResult::Failed(format!("no handler registered for '{}'", job.handler)),
        }
    }
}

/// Per-process job counters.
#[derive(Debug, Default)]
pub(crate) struct JobStats {
    pub(crate) scheduled: AtomicUsize,
    pub(crate) pending: AtomicUsize,
    pub(crate) processing: AtomicUsize,
    pub(crate) completed: AtomicUsize,
    pub(crate) failed: AtomicUsize,
}

impl JobStats {
    pub(crate) fn incr(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decr(counter: &AtomicUsize) {
        let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub(crate) fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::Relaxed)
    }
}
