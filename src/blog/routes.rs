use axum::{routing::post, Router};

use super::handlers;

/// Creates the blog router
pub fn blog_routes() -> Router {
    Router::new()
        .route("/blog/send_post", post(handlers::send_post))
        .route("/blog/get_user_posts", post(handlers::get_user_posts))
}
