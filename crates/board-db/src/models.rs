//! Database row types. These map directly to SQLite rows.
//! Distinct from board-types API models: rows carry password hashes.

use chrono::{DateTime, Utc};

use board_types::models::{GroupSort, PostSort};

#[derive(Debug, Clone)]
pub struct GroupRow {
    pub id: i64,
    pub name: String,
    pub password: String,
    pub image_url: Option<String>,
    pub is_public: bool,
    pub introduction: Option<String>,
    pub like_count: i64,
    pub post_count: i64,
    pub badge_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub group_id: i64,
    pub nickname: String,
    pub title: String,
    pub content: String,
    pub password: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub moment: Option<String>,
    pub is_public: bool,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub nickname: String,
    pub content: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

// -- Inserts --

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub password_hash: String,
    pub image_url: Option<String>,
    pub is_public: bool,
    pub introduction: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub group_id: i64,
    pub nickname: String,
    pub title: String,
    pub content: String,
    pub password_hash: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub moment: Option<String>,
    pub is_public: bool,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub nickname: String,
    pub content: String,
    pub password_hash: String,
}

// -- Partial updates; `None` leaves the column untouched --

#[derive(Debug, Clone, Default)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub is_public: Option<bool>,
    pub introduction: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub nickname: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub location: Option<String>,
    pub moment: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentChanges {
    pub nickname: Option<String>,
    pub content: Option<String>,
}

// -- Listing --

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

#[derive(Debug, Clone)]
pub struct GroupFilter {
    pub is_public: bool,
    pub keyword: Option<String>,
    pub sort: GroupSort,
}

#[derive(Debug, Clone)]
pub struct PostFilter {
    pub group_id: i64,
    pub is_public: bool,
    pub keyword: Option<String>,
    pub sort: PostSort,
}
