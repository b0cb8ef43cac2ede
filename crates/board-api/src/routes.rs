use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use crate::state::AppState;
use crate::{comments, groups, images, posts};

/// Every board endpoint, without transport layers (CORS, tracing).
pub fn router(state: AppState) -> Router {
    let image_limit = DefaultBodyLimit::max(state.max_image_bytes);

    Router::new()
        .route(
            "/api/groups",
            get(groups::list_groups).post(groups::create_group),
        )
        .route(
            "/api/groups/{id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/api/groups/{id}/is-public", get(groups::is_public))
        .route(
            "/api/groups/{id}/verify-password",
            post(groups::verify_password),
        )
        .route("/api/groups/{id}/like", post(groups::like_group))
        .route(
            "/api/groups/{id}/posts",
            get(posts::list_posts).post(posts::create_post),
        )
        .route(
            "/api/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/api/posts/{id}/verify-password", post(posts::verify_password))
        .route("/api/posts/{id}/like", post(posts::like_post))
        .route("/api/posts/{id}/is-public", get(posts::is_public))
        .route(
            "/api/posts/{id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/api/comments/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/api/image", post(images::upload_image).layer(image_limit))
        .route("/api/image/{name}", get(images::get_image))
        .with_state(state)
}
