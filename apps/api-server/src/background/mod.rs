//! Background jobs run by the job queue workers.

mod tweet;

use std::sync::Arc;

use postflow_core::domain::SendTweet;
use postflow_core::ports::{JobQueue, JobQueueError, LinkShortener};

pub use tweet::{send_tweet, send_tweet_handler};

/// Register every job handler the server knows about.
pub async fn register_jobs(
    queue: &dyn JobQueue,
    shortener: Arc<dyn LinkShortener>,
    public_base_url: String,
) -> Result<(), JobQueueError> {
    queue
        .register(
            SendTweet::HANDLER,
            send_tweet_handler(shortener, public_base_url),
        )
        .await?;

    tracing::info!(handler = SendTweet::HANDLER, "Registered job handler");
    Ok(())
}
