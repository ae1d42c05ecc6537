//! Post handlers. Every route acts on the caller's own posts only.

use actix_web::{HttpResponse, http::header, web};
use uuid::Uuid;

use postflow_core::domain::{Post, SendTweet};
use postflow_core::error::{DomainError, RepoError};
use postflow_shared::ApiResponse;
use postflow_shared::dto::{PostForm, PostResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Post body accepted as JSON or as an urlencoded form.
pub type PostInput = web::Either<web::Json<PostForm>, web::Form<PostForm>>;

fn form_input(input: PostInput) -> PostForm {
    match input {
        web::Either::Left(json) => json.into_inner(),
        web::Either::Right(form) => form.into_inner(),
    }
}

fn to_response(post: Post) -> PostResponse {
    PostResponse {
        id: post.id,
        user_id: post.user_id,
        title: post.title,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

fn redirect<T: serde::Serialize>(location: String, body: ApiResponse<T>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .json(body)
}

fn post_not_found() -> DomainError {
    DomainError::NotFound { entity_type: "Post" }
}

/// Load a post owned by the caller. Missing and foreign posts are the same 404.
async fn owned_post(state: &AppState, identity: &Identity, post_id: Uuid) -> AppResult<Post> {
    let post = state
        .posts
        .find_owned(post_id, identity.user_id)
        .await?
        .ok_or_else(post_not_found)?;
    Ok(post)
}

/// List the caller's posts, newest first.
///
/// GET /posts
pub async fn list(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let posts = state.posts.find_by_user_id(identity.user_id).await?;
    let posts: Vec<PostResponse> = posts.into_iter().map(to_response).collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

/// GET /posts/{post_id}
pub async fn show(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = owned_post(&state, &identity, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(to_response(post))))
}

/// Empty form for a new post.
///
/// GET /posts/new
pub async fn new_form(_identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(PostForm::default()))
}

/// Create a post owned by the caller, then queue the deferred tweet job.
///
/// POST /posts
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    input: PostInput,
) -> AppResult<HttpResponse> {
    let form = form_input(input);
    let post = Post::new(identity.user_id, form.title.clone());
    post.validate().map_err(|e| AppError::from(e).with_input(&form))?;

    let post = state.posts.save(post).await?;

    tracing::info!(post_id = %post.id, user_id = %identity.user_id, "Post created");

    match SendTweet::for_post(&post).into_job() {
        Ok(job) => {
            if let Err(e) = state.jobs.enqueue(job).await {
                tracing::error!(post_id = %post.id, error = %e, "Failed to enqueue send_tweet job");
            }
        }
        Err(e) => {
            tracing::error!(post_id = %post.id, error = %e, "Failed to build send_tweet job")
        }
    }

    Ok(redirect(
        format!("/posts/{}", post.id),
        ApiResponse::ok_with_message(to_response(post), "Post was created successfully"),
    ))
}

/// Form prefilled with the post's current values.
///
/// GET /posts/{post_id}/edit
pub async fn edit(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = owned_post(&state, &identity, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostForm { title: post.title })))
}

/// PUT /posts/{post_id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    input: PostInput,
) -> AppResult<HttpResponse> {
    let mut post = owned_post(&state, &identity, path.into_inner()).await?;
    let form = form_input(input);

    post.update_title(form.title.clone());
    post.validate().map_err(|e| AppError::from(e).with_input(&form))?;

    let post = state.posts.save(post).await?;

    tracing::info!(post_id = %post.id, "Post updated");

    Ok(redirect(
        format!("/posts/{}", post.id),
        ApiResponse::ok_with_message(to_response(post), "Post was updated successfully"),
    ))
}

/// DELETE /posts/{post_id}
pub async fn destroy(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = owned_post(&state, &identity, path.into_inner()).await?;

    // Deleted concurrently since the lookup: still the usual 404
    state.posts.delete(post.id).await.map_err(|e| match e {
        RepoError::NotFound => AppError::from(post_not_found()),
        other => AppError::from(other),
    })?;

    tracing::info!(post_id = %post.id, "Post destroyed");

    Ok(redirect(
        "/posts".to_string(),
        ApiResponse::message("Post was destroyed successfully"),
    ))
}
