use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::validation::ValidationErrors;

/// Post entity - a titled entry owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post bound to its owner.
    pub fn new(user_id: Uuid, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the post before it is written.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut errors = ValidationErrors::new();
        if self.title.trim().is_empty() {
            errors.add("title", "Title can not be blank.");
        }
        errors.into_result().map_err(DomainError::Validation)
    }

    /// Replace the editable fields and bump `updated_at`.
    pub fn update_title(&mut self, title: String) {
        self.title = title;
        self.updated_at = Utc::now();
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Public URL of a post: `<base>/posts/<id>`.
    pub fn canonical_url(base_url: &str, id: Uuid) -> String {
        format!("{}/posts/{}", base_url.trim_end_matches('/'), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_post_is_owned() {
        let owner = Uuid::new_v4();
        let post = Post::new(owner, "Hello".to_string());

        assert!(post.is_owned_by(owner));
        assert!(!post.is_owned_by(Uuid::new_v4()));
        assert_eq!(post.created_at, post.updated_at);
    }

    #[test]
    fn test_blank_title_fails_validation() {
        let post = Post::new(Uuid::new_v4(), "   ".to_string());

        let Err(DomainError::Validation(errors)) = post.validate() else {
            panic!("blank title passed validation");
        };
        assert_eq!(errors.get("title").unwrap(), ["Title can not be blank."]);
    }

    #[test]
    fn test_titled_post_is_valid() {
        let post = Post::new(Uuid::new_v4(), "Go generics".to_string());
        assert!(post.validate().is_ok());
    }

    #[test]
    fn test_update_title_touches_timestamp() {
        let mut post = Post::new(Uuid::new_v4(), "Old".to_string());
        let created = post.created_at;

        post.update_title("New".to_string());

        assert_eq!(post.title, "New");
        assert!(post.updated_at >= created);
        assert_eq!(post.created_at, created);
    }

    #[test]
    fn test_canonical_url_tolerates_trailing_slash() {
        let id = Uuid::new_v4();
        assert_eq!(
            Post::canonical_url("https://golangflow.io/", id),
            format!("https://golangflow.io/posts/{}", id)
        );
        assert_eq!(
            Post::canonical_url("https://golangflow.io", id),
            format!("https://golangflow.io/posts/{}", id)
        );
    }
}
