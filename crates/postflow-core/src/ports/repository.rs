use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Post;
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// Post repository. Every lookup that serves a request is scoped to the
/// owner, so a post belonging to someone else is reported as absent.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// All posts owned by `user_id`, newest first.
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Post>, RepoError>;

    /// A single post, only if it is owned by `user_id`.
    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> Result<Option<Post>, RepoError>;
}
