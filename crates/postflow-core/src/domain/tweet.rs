//! The deferred "send tweet" job queued after a post is created.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Post;
use crate::ports::Job;

/// Arguments of the `send_tweet` job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTweet {
    pub post_id: Uuid,
    pub title: String,
}

impl SendTweet {
    pub const QUEUE: &'static str = "tweet";
    pub const HANDLER: &'static str = "send_tweet";
    /// Grace period before the job becomes eligible, so the author can still edit.
    pub const DELAY_SECS: i64 = 15;

    pub fn for_post(post: &Post) -> Self {
        Self {
            post_id: post.id,
            title: post.title.clone(),
        }
    }

    /// Build the delayed, non-retried job carrying this payload.
    pub fn into_job(self) -> Result<Job, serde_json::Error> {
        let payload = serde_json::to_value(self)?;
        Ok(Job::new(Self::QUEUE, Self::HANDLER, payload)
            .with_max_attempts(1)
            .delayed(chrono::Duration::seconds(Self::DELAY_SECS)))
    }

    pub fn from_job(job: &Job) -> Result<Self, serde_json::Error> {
        serde_json::from_value(job.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_carries_post_id_and_title() {
        let post = Post::new(Uuid::new_v4(), "Generics land in Go".to_string());

        let job = SendTweet::for_post(&post).into_job().unwrap();

        assert_eq!(job.queue, "tweet");
        assert_eq!(job.handler, "send_tweet");
        assert_eq!(job.max_attempts, 1);
        assert_eq!(
            job.payload,
            serde_json::json!({"post_id": post.id, "title": "Generics land in Go"})
        );
        assert_eq!(
            job.scheduled_at.unwrap() - job.created_at,
            chrono::Duration::seconds(15)
        );
    }

    #[test]
    fn test_from_job_rejects_foreign_payload() {
        let job = Job::new("tweet", "send_tweet", serde_json::json!({"post_id": 42}));
        assert!(SendTweet::from_job(&job).is_err());
    }
}
