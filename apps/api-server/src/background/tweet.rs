//! The `send_tweet` job: shorten the post's public URL.
//!
//! Posting the tweet itself is not wired up. The job stops once the short
//! link is known and logs it.

use std::sync::Arc;

use postflow_core::domain::{Post, SendTweet};
use postflow_core::ports::{Job, JobHandler, JobResult, LinkShortener, ShortenError, job_handler};

/// Run one `send_tweet` job. Failures are terminal; the job is never retried.
pub async fn send_tweet(
    shortener: &dyn LinkShortener,
    public_base_url: &str,
    job: Job,
) -> JobResult {
    let args = match SendTweet::from_job(&job) {
        Ok(args) => args,
        Err(e) => {
            tracing::error!(job_id = %job.id, error = %e, "Malformed send_tweet payload");
            return JobResult::Failed(format!("malformed payload: {}", e));
        }
    };

    let long_url = Post::canonical_url(public_base_url, args.post_id);

    match shortener.shorten(&long_url).await {
        Ok(short_url) => {
            tracing::info!(
                job_id = %job.id,
                post_id = %args.post_id,
                title = %args.title,
                short_url = %short_url,
                "Shortened post link"
            );
            JobResult::Success
        }
        Err(e @ ShortenError::Configuration(_)) => {
            tracing::warn!(
                job_id = %job.id,
                post_id = %args.post_id,
                error = %e,
                "Skipping link shortening"
            );
            JobResult::Failed(e.to_string())
        }
        Err(e) => {
            tracing::error!(
                job_id = %job.id,
                post_id = %args.post_id,
                long_url = %long_url,
                error = %e,
                "Failed to shorten post link"
            );
            JobResult::Failed(e.to_string())
        }
    }
}

/// Bind [`send_tweet`] to its dependencies as a queue handler.
pub fn send_tweet_handler(
    shortener: Arc<dyn LinkShortener>,
    public_base_url: String,
) -> JobHandler {
    job_handler(move |job: Job| {
        let shortener = shortener.clone();
        let public_base_url = public_base_url.clone();
        async move { send_tweet(shortener.as_ref(), &public_base_url, job).await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use postflow_core::ports::JobQueue;
    use postflow_infra::{BitlyConfig, BitlyShortener, InMemoryJobQueue, InMemoryJobQueueConfig};

    const BASE_URL: &str = "https://golangflow.io";

    /// Records every URL it is asked to shorten.
    #[derive(Default)]
    struct RecordingShortener {
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LinkShortener for RecordingShortener {
        async fn shorten(&self, long_url: &str) -> Result<String, ShortenError> {
            let mut requests = self.requests.lock().await;
            requests.push(long_url.to_string());
            Ok(format!("http://bit.ly/{}", requests.len()))
        }
    }

    struct DownShortener;

    #[async_trait]
    impl LinkShortener for DownShortener {
        async fn shorten(&self, _long_url: &str) -> Result<String, ShortenError> {
            Err(ShortenError::Network("connection refused".to_string()))
        }
    }

    fn tweet_job(post: &Post) -> Job {
        SendTweet::for_post(post).into_job().unwrap()
    }

    #[tokio::test]
    async fn test_shortens_canonical_post_url() {
        let shortener = RecordingShortener::default();
        let post = Post::new(Uuid::new_v4(), "Generics land in Go".to_string());

        let result = send_tweet(&shortener, "https://golangflow.io/", tweet_job(&post)).await;

        assert_eq!(result, JobResult::Success);
        assert_eq!(
            *shortener.requests.lock().await,
            vec![format!("https://golangflow.io/posts/{}", post.id)]
        );
    }

    #[tokio::test]
    async fn test_running_twice_is_harmless() {
        let shortener = RecordingShortener::default();
        let post = Post::new(Uuid::new_v4(), "Twice".to_string());
        let job = tweet_job(&post);

        assert_eq!(send_tweet(&shortener, BASE_URL, job.clone()).await, JobResult::Success);
        assert_eq!(send_tweet(&shortener, BASE_URL, job).await, JobResult::Success);
        assert_eq!(shortener.requests.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unconfigured_bitly_fails_without_request() {
        let shortener = BitlyShortener::new(BitlyConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            ..BitlyConfig::default()
        })
        .unwrap();
        let post = Post::new(Uuid::new_v4(), "No creds".to_string());

        let result = send_tweet(&shortener, BASE_URL, tweet_job(&post)).await;

        match result {
            JobResult::Failed(reason) => assert!(reason.contains("BITLY_ACCESS_TOKEN")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shortener_outage_fails_job() {
        let post = Post::new(Uuid::new_v4(), "Outage".to_string());

        let result = send_tweet(&DownShortener, BASE_URL, tweet_job(&post)).await;

        assert!(matches!(result, JobResult::Failed(_)));
    }

    #[tokio::test]
    async fn test_malformed_payload_fails() {
        let shortener = RecordingShortener::default();
        let job = Job::new(SendTweet::QUEUE, SendTweet::HANDLER, serde_json::json!({"id": 1}));

        let result = send_tweet(&shortener, BASE_URL, job).await;

        assert!(matches!(result, JobResult::Failed(_)));
        assert!(shortener.requests.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_job_runs_after_grace_period() {
        let shortener = Arc::new(RecordingShortener::default());
        let queue = InMemoryJobQueue::new(InMemoryJobQueueConfig {
            max_size: 10,
            workers: 1,
        });
        crate::background::register_jobs(&queue, shortener.clone(), BASE_URL.to_string())
            .await
            .unwrap();
        queue.start().await.unwrap();

        let post = Post::new(Uuid::new_v4(), "Queued".to_string());
        queue.enqueue(tweet_job(&post)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(shortener.requests.lock().await.is_empty());

        tokio::time::sleep(Duration::from_secs(10)).await;
        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(shortener.requests.lock().await.len(), 1);
    }
}
