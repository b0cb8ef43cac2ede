use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use board_db::models::{NewPost, PostChanges, PostFilter, PostRow};
use board_types::api::{
    CreatePostRequest, LikeResponse, MessageResponse, Page, PostDetail, PostPasswordRequest,
    PostSummary, UpdatePostRequest, VisibilityResponse,
};
use board_types::models::EntityKind;

use crate::error::ApiError;
use crate::params::{self, PostListQuery};
use crate::passwords;
use crate::state::{AppState, AppStateInner, blocking};

pub fn post_summary(row: PostRow) -> PostSummary {
    PostSummary {
        id: row.id,
        nickname: row.nickname,
        title: row.title,
        image_url: row.image_url,
        tags: row.tags,
        location: row.location,
        moment: row.moment,
        is_public: row.is_public,
        like_count: row.like_count,
        comment_count: row.comment_count,
        created_at: row.created_at,
    }
}

fn post_detail(mut row: PostRow) -> PostDetail {
    let group_id = row.group_id;
    let content = std::mem::take(&mut row.content);
    PostDetail {
        post: post_summary(row),
        group_id,
        content,
    }
}

fn load_post(state: &AppStateInner, id: i64) -> Result<PostRow, ApiError> {
    state
        .db()
        .get_post(id)?
        .ok_or_else(|| ApiError::not_found(EntityKind::Post, id))
}

/// Tags are trimmed and blank ones dropped.
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// POST /api/groups/{id}/posts
pub async fn create_post(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let nickname = params::required("nickname", &req.nickname)?;
    let title = params::required("title", &req.title)?;
    let content = params::required("content", &req.content)?;
    params::required("postPassword", &req.post_password)?;

    let detail = blocking(&state, move |state| {
        let group = state
            .db()
            .get_group(group_id)?
            .ok_or_else(|| ApiError::not_found(EntityKind::Group, group_id))?;
        passwords::require_password(&req.group_password, &group.password)?;

        let new = NewPost {
            group_id,
            nickname,
            title,
            content,
            password_hash: passwords::hash_password(&req.post_password)?,
            image_url: req.image_url,
            tags: clean_tags(req.tags),
            location: req.location,
            moment: req.moment,
            is_public: req.is_public,
        };
        let created = state.activity.create_post(&new, Utc::now())?;
        info!(
            group_id,
            post_id = created.post.id,
            badges_awarded = created.awarded.len(),
            "Post created"
        );
        Ok(post_detail(created.post))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/groups/{id}/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Page<PostSummary>>, ApiError> {
    let page = params::page_request(query.page, query.page_size)?;
    let filter = PostFilter {
        group_id,
        is_public: query.is_public,
        keyword: params::keyword(query.keyword),
        sort: query.sort_by,
    };

    blocking(&state, move |state| {
        if state.db().get_group(group_id)?.is_none() {
            return Err(ApiError::not_found(EntityKind::Group, group_id));
        }
        let (rows, total) = state.db().list_posts(&filter, page)?;
        let data = rows.into_iter().map(post_summary).collect();
        Ok(Json(Page::new(page.page, page.page_size, total, data)))
    })
    .await
}

/// GET /api/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostDetail>, ApiError> {
    blocking(&state, move |state| Ok(Json(post_detail(load_post(state, id)?)))).await
}

/// PUT /api/posts/{id}
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<PostDetail>, ApiError> {
    let changes = PostChanges {
        nickname: params::optional("nickname", req.nickname)?,
        title: params::optional("title", req.title)?,
        content: params::optional("content", req.content)?,
        image_url: req.image_url,
        tags: req.tags.map(clean_tags),
        location: req.location,
        moment: req.moment,
        is_public: req.is_public,
    };
    let password = req.post_password;

    blocking(&state, move |state| {
        let post = load_post(state, id)?;
        passwords::require_password(&password, &post.password)?;
        Ok(Json(post_detail(state.db().update_post(id, &changes)?)))
    })
    .await
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<PostPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, move |state| {
        let post = load_post(state, id)?;
        passwords::require_password(&req.post_password, &post.password)?;

        state.activity.delete_post(id, Utc::now())?;
        info!(group_id = post.group_id, post_id = id, "Post deleted");
        Ok(Json(MessageResponse::new("post deleted")))
    })
    .await
}

/// POST /api/posts/{id}/verify-password
pub async fn verify_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<PostPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, move |state| {
        let post = load_post(state, id)?;
        if !passwords::verify_password(&req.post_password, &post.password)? {
            return Err(ApiError::Unauthorized);
        }
        Ok(Json(MessageResponse::new("password verified")))
    })
    .await
}

/// POST /api/posts/{id}/like
pub async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LikeResponse>, ApiError> {
    blocking(&state, move |state| {
        let liked = state.activity.like_post(id, Utc::now())?;
        Ok(Json(LikeResponse {
            message: "post liked".into(),
            like_count: liked.like_count,
        }))
    })
    .await
}

/// GET /api/posts/{id}/is-public
pub async fn is_public(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<VisibilityResponse>, ApiError> {
    blocking(&state, move |state| {
        let post = load_post(state, id)?;
        Ok(Json(VisibilityResponse {
            id: post.id,
            is_public: post.is_public,
        }))
    })
    .await
}
