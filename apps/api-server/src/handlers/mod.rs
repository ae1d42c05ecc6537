//! HTTP handlers and route configuration.

mod health;
mod posts;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Public routes
        .route("/health", web::get().to(health::health_check))
        // Owner-scoped posts; every handler requires a bearer token
        .service(
            web::scope("/posts")
                .route("", web::get().to(posts::list))
                .route("", web::post().to(posts::create))
                .route("/new", web::get().to(posts::new_form))
                .route("/{post_id}", web::get().to(posts::show))
                .route("/{post_id}", web::put().to(posts::update))
                .route("/{post_id}", web::delete().to(posts::destroy))
                .route("/{post_id}/edit", web::get().to(posts::edit)),
        );
}
