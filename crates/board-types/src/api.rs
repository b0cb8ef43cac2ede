use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::BadgeKind;

fn default_true() -> bool {
    true
}

// -- Shared --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Paginated listing envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_item_count: u64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(current_page: u32, page_size: u32, total_item_count: u64, data: Vec<T>) -> Self {
        let total_pages = total_item_count.div_ceil(u64::from(page_size.max(1))) as u32;
        Self {
            current_page,
            total_pages,
            total_item_count,
            data,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityResponse {
    pub id: i64,
    pub is_public: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub message: String,
    pub like_count: i64,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    pub password: String,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    pub introduction: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateGroupRequest {
    pub password: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub is_public: Option<bool>,
    pub introduction: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordRequest {
    pub password: String,
}

/// Group as listed. Never carries the password.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: i64,
    pub name: String,
    pub image_url: Option<String>,
    pub is_public: bool,
    pub like_count: i64,
    pub post_count: i64,
    pub badge_count: i64,
    pub introduction: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: GroupSummary,
    pub badges: Vec<BadgeKind>,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePostRequest {
    pub nickname: String,
    pub title: String,
    pub content: String,
    pub post_password: String,
    pub group_password: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub moment: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub post_password: String,
    pub nickname: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub location: Option<String>,
    pub moment: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostPasswordRequest {
    pub post_password: String,
}

/// Post as listed: no body text, no passwords.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: i64,
    pub nickname: String,
    pub title: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub moment: Option<String>,
    pub is_public: bool,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostSummary,
    pub group_id: i64,
    pub content: String,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub nickname: String,
    pub content: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    pub password: String,
    pub nickname: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub nickname: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// -- Images --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub image_url: String,
}
