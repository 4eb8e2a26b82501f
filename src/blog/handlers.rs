//! Blog handlers

use axum::extract::{Extension, Json};
use tracing::{debug, info};

use super::models::{BlogPostRequest, PostRecord};
use crate::auth::AuthedUser;
use crate::common::state::SharedState;
use crate::common::ApiError;

/// POST /blog/send_post
/// Appends a post authored by the bearer to the post log and echoes it back
///
/// # Request Body
/// ```json
/// { "title": "first post", "post": "hello there and welcome to my blog !" }
/// ```
pub async fn send_post(
    Extension(state): Extension<SharedState>,
    user: AuthedUser,
    Json(payload): Json<BlogPostRequest>,
) -> Result<Json<PostRecord>, ApiError> {
    let record = PostRecord {
        user_id: user.user_id,
        email: user.email,
        title: payload.title,
        post: payload.post,
    };

    state.posts.append(record.clone(), &state.posts_key).await?;

    info!(user_id = %record.user_id, title = %record.title, "Post appended");
    Ok(Json(record))
}

/// POST /blog/get_user_posts
/// Lists the bearer's posts in append order
///
/// Ownership is decided by the configured `UserIdMatch` rule. Any request
/// body is ignored.
pub async fn get_user_posts(
    Extension(state): Extension<SharedState>,
    user: AuthedUser,
) -> Result<Json<Vec<PostRecord>>, ApiError> {
    let (records, _) = state.posts.read(&state.posts_key).await?;
    let total = records.len();

    let mine: Vec<PostRecord> = records
        .into_iter()
        .filter(|record| state.user_id_match.matches(&record.user_id, &user.user_id))
        .collect();

    debug!(
        user_id = %user.user_id,
        total,
        matched = mine.len(),
        rule = %state.user_id_match,
        "Listed user posts"
    );
    Ok(Json(mine))
}
