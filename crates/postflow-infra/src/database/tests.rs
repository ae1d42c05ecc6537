use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use uuid::Uuid;

use postflow_core::domain::Post;
use postflow_core::error::RepoError;
use postflow_core::ports::{BaseRepository, PostRepository};

use crate::database::entity::post;
use crate::database::postgres_repo::PostgresPostRepository;

fn model(id: Uuid, user_id: Uuid, title: &str) -> post::Model {
    let now = Utc::now();
    post::Model {
        id,
        user_id,
        title: title.to_owned(),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let post_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![model(post_id, user_id, "Test Post")]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

    let post = result.unwrap();
    assert_eq!(post.title, "Test Post");
    assert_eq!(post.id, post_id);
}

#[tokio::test]
async fn test_find_owned_filters_by_owner() {
    let post_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![model(post_id, user_id, "Mine")]])
        .append_query_results(vec![Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let found = repo.find_owned(post_id, user_id).await.unwrap();
    assert_eq!(found.unwrap().user_id, user_id);

    let missing = repo.find_owned(post_id, Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_find_by_user_id_maps_rows() {
    let user_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![
            model(Uuid::new_v4(), user_id, "second"),
            model(Uuid::new_v4(), user_id, "first"),
        ]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let posts = repo.find_by_user_id(user_id).await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].title, "second");
    assert!(posts.iter().all(|p| p.user_id == user_id));
}

#[tokio::test]
async fn test_save_existing_post_updates() {
    let post = Post::new(Uuid::new_v4(), "Edited".to_string());

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![model(post.id, post.user_id, "Edited")]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let saved = repo.save(post.clone()).await.unwrap();
    assert_eq!(saved.id, post.id);
    assert_eq!(saved.title, "Edited");
}

#[tokio::test]
async fn test_save_new_post_falls_back_to_insert() {
    let post = Post::new(Uuid::new_v4(), "Fresh".to_string());

    // UPDATE .. RETURNING matches nothing, then INSERT .. RETURNING yields the row
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![
            Vec::<post::Model>::new(),
            vec![model(post.id, post.user_id, "Fresh")],
        ])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let saved = repo.save(post.clone()).await.unwrap();
    assert_eq!(saved.id, post.id);
    assert_eq!(saved.user_id, post.user_id);
    assert_eq!(saved.title, "Fresh");
}

#[tokio::test]
async fn test_delete_missing_row_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let id = Uuid::new_v4();

    BaseRepository::<Post, Uuid>::delete(&repo, id).await.unwrap();
    let second = BaseRepository::<Post, Uuid>::delete(&repo, id).await;
    assert!(matches!(second, Err(RepoError::NotFound)));
}
