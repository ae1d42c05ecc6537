//! # Postflow Infrastructure
//!
//! Concrete implementations of the ports defined in `postflow-core`.
//! This crate contains the database, job queue, and external service integrations.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL database support via SeaORM
//! - `auth` - JWT bearer token verification
//! - `redis` - Redis-backed job queue
//! - `bitly` - Bitly link shortener client

pub mod database;
pub mod jobs;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "bitly")]
pub mod shortener;

// Re-exports - In-Memory
pub use database::InMemoryPostRepository;
pub use jobs::{InMemoryJobQueue, InMemoryJobQueueConfig};

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService};

#[cfg(feature = "bitly")]
pub use shortener::{BitlyConfig, BitlyShortener};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use jobs::{RedisConfig, RedisJobQueue, RedisJobQueueConfig};
