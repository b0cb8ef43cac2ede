use serde::Deserialize;

use board_db::models::PageRequest;
use board_types::models::{GroupSort, PostSort};

use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

fn first_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupListQuery {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub sort_by: GroupSort,
    pub keyword: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListQuery {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub sort_by: PostSort,
    pub keyword: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Pages start at 1. Oversized pages are clamped rather than rejected.
pub fn page_request(page: u32, page_size: u32) -> Result<PageRequest, ApiError> {
    if page == 0 {
        return Err(ApiError::BadRequest("page starts at 1".into()));
    }
    if page_size == 0 {
        return Err(ApiError::BadRequest("pageSize must be positive".into()));
    }
    Ok(PageRequest {
        page,
        page_size: page_size.min(MAX_PAGE_SIZE),
    })
}

/// Blank keywords mean no filter.
pub fn keyword(raw: Option<String>) -> Option<String> {
    raw.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

/// A required text field, trimmed.
pub fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// An optional text field: absent is fine, present but blank is not.
pub fn optional(field: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    value.map(|v| required(field, &v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped() {
        let page = page_request(3, 500).unwrap();
        assert_eq!(page.page_size, MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 200);
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(matches!(page_request(0, 10), Err(ApiError::BadRequest(_))));
        assert!(matches!(page_request(1, 0), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(keyword(Some("  ".into())), None);
        assert_eq!(keyword(Some(" trail ".into())), Some("trail".into()));
        assert!(required("name", " \t").is_err());
        assert_eq!(optional("name", None).unwrap(), None);
        assert!(optional("name", Some(String::new())).is_err());
    }
}
