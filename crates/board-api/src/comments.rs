use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use board_db::models::{CommentChanges, CommentRow, NewComment};
use board_types::api::{
    CommentResponse, CreateCommentRequest, MessageResponse, Page, PasswordRequest,
    UpdateCommentRequest,
};
use board_types::models::EntityKind;

use crate::error::ApiError;
use crate::params::{self, PageQuery};
use crate::passwords;
use crate::state::{AppState, AppStateInner, blocking};

pub fn comment_response(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: row.id,
        nickname: row.nickname,
        content: row.content,
        created_at: row.created_at,
    }
}

fn load_comment(state: &AppStateInner, id: i64) -> Result<CommentRow, ApiError> {
    state
        .db()
        .get_comment(id)?
        .ok_or_else(|| ApiError::not_found(EntityKind::Comment, id))
}

/// GET /api/posts/{id}/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<CommentResponse>>, ApiError> {
    let page = params::page_request(query.page, query.page_size)?;

    blocking(&state, move |state| {
        if state.db().get_post(post_id)?.is_none() {
            return Err(ApiError::not_found(EntityKind::Post, post_id));
        }
        let (rows, total) = state.db().list_comments(post_id, page)?;
        let data = rows.into_iter().map(comment_response).collect();
        Ok(Json(Page::new(page.page, page.page_size, total, data)))
    })
    .await
}

/// POST /api/posts/{id}/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let nickname = params::required("nickname", &req.nickname)?;
    let content = params::required("content", &req.content)?;
    params::required("password", &req.password)?;

    let comment = blocking(&state, move |state| {
        let new = NewComment {
            post_id,
            nickname,
            content,
            password_hash: passwords::hash_password(&req.password)?,
        };
        let comment = state.activity.create_comment(&new, Utc::now())?;
        Ok(comment_response(comment))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// PUT /api/comments/{id}
pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let changes = CommentChanges {
        nickname: params::optional("nickname", req.nickname)?,
        content: params::optional("content", req.content)?,
    };
    let password = req.password;

    blocking(&state, move |state| {
        let comment = load_comment(state, id)?;
        passwords::require_password(&password, &comment.password)?;
        Ok(Json(comment_response(state.db().update_comment(id, &changes)?)))
    })
    .await
}

/// DELETE /api/comments/{id}
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<PasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, move |state| {
        let comment = load_comment(state, id)?;
        passwords::require_password(&req.password, &comment.password)?;

        state.activity.delete_comment(id, Utc::now())?;
        Ok(Json(MessageResponse::new("comment deleted")))
    })
    .await
}
