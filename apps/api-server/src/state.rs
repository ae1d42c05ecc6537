//! Application state - shared across all handlers.

use std::sync::Arc;

use postflow_core::ports::{JobQueue, LinkShortener, PostRepository};
use postflow_infra::{BitlyShortener, InMemoryJobQueue, InMemoryPostRepository};

#[cfg(feature = "postgres")]
use postflow_infra::database::{self, PostgresPostRepository};
#[cfg(feature = "redis")]
use postflow_infra::{RedisConfig, RedisJobQueue, RedisJobQueueConfig};

use crate::background;
use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<dyn PostRepository>,
    pub jobs: Arc<dyn JobQueue>,
}

impl AppState {
    pub fn new(posts: Arc<dyn PostRepository>, jobs: Arc<dyn JobQueue>) -> Self {
        Self { posts, jobs }
    }

    /// Build the application state with appropriate implementations and
    /// register the background job handlers.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let posts = build_post_repository(config).await;
        let jobs = build_job_queue(config).await;

        if !config.bitly.is_configured() {
            tracing::warn!("Bitly credentials incomplete. Post links will not be shortened.");
        }
        let shortener: Arc<dyn LinkShortener> =
            Arc::new(BitlyShortener::new(config.bitly.clone())?);
        background::register_jobs(jobs.as_ref(), shortener, config.public_base_url.clone()).await?;

        tracing::info!("Application state initialized");

        Ok(Self::new(posts, jobs))
    }
}

#[cfg(feature = "postgres")]
async fn build_post_repository(config: &AppConfig) -> Arc<dyn PostRepository> {
    let Some(db_config) = &config.database else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return Arc::new(InMemoryPostRepository::new());
    };

    match database::connect(db_config).await {
        Ok(conn) => Arc::new(PostgresPostRepository::new(conn)),
        Err(e) => {
            tracing::error!(
                "Failed to connect to database: {}. Using in-memory fallback.",
                e
            );
            Arc::new(InMemoryPostRepository::new())
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_post_repository(_config: &AppConfig) -> Arc<dyn PostRepository> {
    tracing::info!("Running without postgres feature - using in-memory repository");
    Arc::new(InMemoryPostRepository::new())
}

#[cfg(feature = "redis")]
async fn build_job_queue(config: &AppConfig) -> Arc<dyn JobQueue> {
    let Some(url) = &config.redis_url else {
        tracing::info!("REDIS_URL not set. Using in-memory job queue.");
        return Arc::new(InMemoryJobQueue::from_env());
    };

    let queue_config = RedisJobQueueConfig {
        redis: RedisConfig {
            url: url.clone(),
            ..RedisConfig::from_env()
        },
        ..RedisJobQueueConfig::from_env()
    };

    match RedisJobQueue::new(queue_config).await {
        Ok(queue) => Arc::new(queue),
        Err(e) => {
            tracing::error!(
                "Failed to connect to Redis job queue: {}. Using in-memory fallback.",
                e
            );
            Arc::new(InMemoryJobQueue::from_env())
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn build_job_queue(_config: &AppConfig) -> Arc<dyn JobQueue> {
    tracing::info!("Running without redis feature - using in-memory job queue");
    Arc::new(InMemoryJobQueue::from_env())
}
