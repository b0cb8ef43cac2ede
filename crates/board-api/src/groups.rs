use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use board_db::models::{GroupChanges, GroupFilter, GroupRow, NewGroup};
use board_types::api::{
    CreateGroupRequest, GroupDetail, GroupSummary, LikeResponse, MessageResponse, Page,
    PasswordRequest, UpdateGroupRequest, VisibilityResponse,
};
use board_types::models::{BadgeSet, EntityKind};

use crate::error::ApiError;
use crate::params::{self, GroupListQuery};
use crate::passwords;
use crate::state::{AppState, AppStateInner, blocking};

pub fn group_summary(row: GroupRow) -> GroupSummary {
    GroupSummary {
        id: row.id,
        name: row.name,
        image_url: row.image_url,
        is_public: row.is_public,
        like_count: row.like_count,
        post_count: row.post_count,
        badge_count: row.badge_count,
        introduction: row.introduction,
        created_at: row.created_at,
    }
}

fn group_detail(row: GroupRow, badges: &BadgeSet) -> GroupDetail {
    GroupDetail {
        group: group_summary(row),
        badges: badges.awarded(),
    }
}

fn load_group(state: &AppStateInner, id: i64) -> Result<GroupRow, ApiError> {
    state
        .db()
        .get_group(id)?
        .ok_or_else(|| ApiError::not_found(EntityKind::Group, id))
}

/// GET /api/groups
pub async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<GroupListQuery>,
) -> Result<Json<Page<GroupSummary>>, ApiError> {
    let page = params::page_request(query.page, query.page_size)?;
    let filter = GroupFilter {
        is_public: query.is_public,
        keyword: params::keyword(query.keyword),
        sort: query.sort_by,
    };

    blocking(&state, move |state| {
        let (rows, total) = state.db().list_groups(&filter, page)?;
        let data = rows.into_iter().map(group_summary).collect();
        Ok(Json(Page::new(page.page, page.page_size, total, data)))
    })
    .await
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = params::required("name", &req.name)?;
    params::required("password", &req.password)?;

    let detail = blocking(&state, move |state| {
        let new = NewGroup {
            name,
            password_hash: passwords::hash_password(&req.password)?,
            image_url: req.image_url,
            is_public: req.is_public,
            introduction: req.introduction,
        };
        let group = state.activity.create_group(&new, Utc::now())?;
        info!(group_id = group.id, "Group created");
        Ok(group_detail(group, &BadgeSet::default()))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/groups/{id}
pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<GroupDetail>, ApiError> {
    blocking(&state, move |state| {
        let (group, badges) = state
            .db()
            .get_group_with_badges(id)?
            .ok_or_else(|| ApiError::not_found(EntityKind::Group, id))?;
        Ok(Json(group_detail(group, &badges)))
    })
    .await
}

/// PUT /api/groups/{id}
pub async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<GroupDetail>, ApiError> {
    let changes = GroupChanges {
        name: params::optional("name", req.name)?,
        image_url: req.image_url,
        is_public: req.is_public,
        introduction: req.introduction,
    };
    let password = req.password;

    blocking(&state, move |state| {
        let group = load_group(state, id)?;
        passwords::require_password(&password, &group.password)?;

        let group = state.db().update_group(id, &changes)?;
        let badges = state.db().get_badges(id)?.unwrap_or_default();
        Ok(Json(group_detail(group, &badges)))
    })
    .await
}

/// DELETE /api/groups/{id}
pub async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<PasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, move |state| {
        let group = load_group(state, id)?;
        passwords::require_password(&req.password, &group.password)?;

        state.activity.delete_group(id)?;
        info!(group_id = id, "Group deleted");
        Ok(Json(MessageResponse::new("group deleted")))
    })
    .await
}

/// GET /api/groups/{id}/is-public
pub async fn is_public(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<VisibilityResponse>, ApiError> {
    blocking(&state, move |state| {
        let group = load_group(state, id)?;
        Ok(Json(VisibilityResponse {
            id: group.id,
            is_public: group.is_public,
        }))
    })
    .await
}

/// POST /api/groups/{id}/verify-password
pub async fn verify_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<PasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, move |state| {
        let group = load_group(state, id)?;
        if !passwords::verify_password(&req.password, &group.password)? {
            return Err(ApiError::Unauthorized);
        }
        Ok(Json(MessageResponse::new("password verified")))
    })
    .await
}

/// POST /api/groups/{id}/like
pub async fn like_group(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LikeResponse>, ApiError> {
    blocking(&state, move |state| {
        let liked = state.activity.like_group(id, Utc::now())?;
        Ok(Json(LikeResponse {
            message: "group liked".into(),
            like_count: liked.like_count,
        }))
    })
    .await
}
