//! In-memory post repository.
//!
//! Used when no database is configured and in tests.
//! Note: Posts are lost on server restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use postflow_core::domain::Post;
use postflow_core::error::RepoError;
use postflow_core::ports::{BaseRepository, PostRepository};

#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<HashMap<Uuid, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.posts.read().await.is_empty()
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        self.posts.write().await.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.posts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Post>, RepoError> {
        let mut posts: Vec<Post> = self
            .posts
            .read()
            .await
            .values()
            .filter(|p| p.is_owned_by(user_id))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self
            .posts
            .read()
            .await
            .get(&id)
            .filter(|p| p.is_owned_by(user_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_owned_hides_other_owners() {
        let repo = InMemoryPostRepository::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let post = repo
            .save(Post::new(alice, "Alice's post".to_string()))
            .await
            .unwrap();

        assert!(repo.find_owned(post.id, alice).await.unwrap().is_some());
        assert!(repo.find_owned(post.id, bob).await.unwrap().is_none());
        assert!(repo.find_owned(Uuid::new_v4(), alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_user_id_newest_first() {
        let repo = InMemoryPostRepository::new();
        let owner = Uuid::new_v4();

        let mut older = Post::new(owner, "older".to_string());
        older.created_at -= chrono::Duration::minutes(5);
        repo.save(older).await.unwrap();
        repo.save(Post::new(owner, "newer".to_string())).await.unwrap();
        repo.save(Post::new(Uuid::new_v4(), "someone else".to_string()))
            .await
            .unwrap();

        let titles: Vec<String> = repo
            .find_by_user_id(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn test_save_overwrites_and_delete_removes() {
        let repo = InMemoryPostRepository::new();
        let mut post = repo
            .save(Post::new(Uuid::new_v4(), "draft".to_string()))
            .await
            .unwrap();

        post.update_title("final".to_string());
        repo.save(post.clone()).await.unwrap();
        assert_eq!(repo.len().await, 1);
        assert_eq!(repo.find_by_id(post.id).await.unwrap().unwrap().title, "final");

        repo.delete(post.id).await.unwrap();
        assert!(repo.is_empty().await);
        assert!(matches!(repo.delete(post.id).await, Err(RepoError::NotFound)));
    }
}
