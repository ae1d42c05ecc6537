//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod job_queue;
mod repository;
mod shortener;

pub use auth::{AuthError, TokenClaims, TokenService};
pub use job_queue::{Job, JobHandler, JobQueue, JobQueueError, JobResult, QueueStats, job_handler};
pub use repository::{BaseRepository, PostRepository};
pub use shortener::{LinkShortener, ShortenError};
