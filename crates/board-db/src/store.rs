//! The store contract the achievement engine is written against.
//!
//! Every mutation here is a single SQL statement that applies relative to the
//! current row value, so concurrent callers never lose updates. Callers that
//! need several statements to land together pass a `Transaction`.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use board_types::models::{BadgeKind, BadgeSet, CounterField, EntityKind};

use crate::models::{CommentRow, GroupRow, PostRow};
use crate::{StoreError, StoreResult, parse_db_time, to_db_time};

/// One counter column on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterTarget {
    pub kind: EntityKind,
    pub id: i64,
    pub field: CounterField,
}

impl CounterTarget {
    pub fn new(kind: EntityKind, id: i64, field: CounterField) -> Self {
        Self { kind, id, field }
    }
}

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

pub(crate) const GROUP_COLUMNS: &str = "id, name, password, image_url, is_public, introduction, \
     like_count, post_count, badge_count, created_at";

pub(crate) const POST_COLUMNS: &str = "id, group_id, nickname, title, content, password, image_url, \
     tags, location, moment, is_public, like_count, comment_count, created_at";

pub(crate) const COMMENT_COLUMNS: &str = "id, post_id, nickname, content, password, created_at";

fn key_column(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Badge => "group_id",
        _ => "id",
    }
}

fn exists(conn: &Connection, kind: EntityKind, id: i64) -> StoreResult<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
        kind.table(),
        key_column(kind)
    );
    Ok(conn.query_row(&sql, [id], |row| row.get(0))?)
}

/// Apply `delta` to a counter in place and return the new value.
///
/// Fails with `NotFound` when the row is absent and `NegativeCounter` when the
/// result would go below zero; in both cases nothing is written.
pub fn adjust_field(conn: &Connection, target: CounterTarget, delta: i64) -> StoreResult<i64> {
    if !target.field.applies_to(target.kind) {
        return Err(StoreError::InvalidField {
            kind: target.kind,
            field: target.field,
        });
    }

    let table = target.kind.table();
    let col = target.field.column();
    let sql = format!(
        "UPDATE {table} SET {col} = {col} + ?1 WHERE id = ?2 AND {col} + ?1 >= 0 RETURNING {col}"
    );

    let value: Option<i64> = conn
        .query_row(&sql, params![delta, target.id], |row| row.get(0))
        .optional()?;

    match value {
        Some(v) => Ok(v),
        None if exists(conn, target.kind, target.id)? => Err(StoreError::NegativeCounter {
            kind: target.kind,
            id: target.id,
            field: target.field,
        }),
        None => Err(StoreError::not_found(target.kind, target.id)),
    }
}

/// Compare-and-set on one badge flag. Returns true only if this call moved the
/// flag from `expected` to `new`.
pub fn conditional_set(
    conn: &Connection,
    group_id: i64,
    badge: BadgeKind,
    expected: bool,
    new: bool,
) -> StoreResult<bool> {
    let col = badge.column();
    let sql = format!("UPDATE badges SET {col} = ?1 WHERE group_id = ?2 AND {col} = ?3");
    let changed = conn.execute(&sql, params![new, group_id, expected])?;

    if changed == 1 {
        return Ok(true);
    }
    if !exists(conn, EntityKind::Badge, group_id)? {
        return Err(StoreError::not_found(EntityKind::Badge, group_id));
    }
    Ok(false)
}

/// Number of posts in `group_id` created inside `window`.
pub fn count_posts_in_range(conn: &Connection, group_id: i64, window: TimeWindow) -> StoreResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE group_id = ?1 AND created_at >= ?2 AND created_at < ?3",
        params![group_id, to_db_time(window.start), to_db_time(window.end)],
        |row| row.get(0),
    )?)
}

/// Whether any post in the group has reached `threshold` likes.
pub fn group_has_popular_post(conn: &Connection, group_id: i64, threshold: i64) -> StoreResult<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE group_id = ?1 AND like_count >= ?2)",
        params![group_id, threshold],
        |row| row.get(0),
    )?)
}

/// Groups created at or before `cutoff` that do not hold the longevity badge.
/// A group whose badge record is missing is still returned so that the caller
/// sees the failure instead of silently skipping the group.
pub fn groups_due_for_longevity(conn: &Connection, cutoff: DateTime<Utc>) -> StoreResult<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT g.id FROM groups g
         LEFT JOIN badges b ON b.group_id = g.id
         WHERE g.created_at <= ?1 AND COALESCE(b.longevity, 0) = 0
         ORDER BY g.id",
    )?;
    let ids = stmt
        .query_map([to_db_time(cutoff)], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

pub fn get_group(conn: &Connection, id: i64) -> StoreResult<Option<GroupRow>> {
    let sql = format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], group_from_row).optional()?)
}

pub fn get_post(conn: &Connection, id: i64) -> StoreResult<Option<PostRow>> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], post_from_row).optional()?)
}

pub fn get_comment(conn: &Connection, id: i64) -> StoreResult<Option<CommentRow>> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], comment_from_row).optional()?)
}

pub fn get_badges(conn: &Connection, group_id: i64) -> StoreResult<Option<BadgeSet>> {
    Ok(conn
        .query_row(
            "SELECT streak, volume, longevity, group_popularity, post_popularity
             FROM badges WHERE group_id = ?1",
            [group_id],
            |row| {
                Ok(BadgeSet {
                    streak: row.get(0)?,
                    volume: row.get(1)?,
                    longevity: row.get(2)?,
                    group_popularity: row.get(3)?,
                    post_popularity: row.get(4)?,
                })
            },
        )
        .optional()?)
}

// -- Row mapping --

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_db_time(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("corrupt timestamp '{raw}'").into(),
        )
    })
}

fn tags_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn group_from_row(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        password: row.get(2)?,
        image_url: row.get(3)?,
        is_public: row.get(4)?,
        introduction: row.get(5)?,
        like_count: row.get(6)?,
        post_count: row.get(7)?,
        badge_count: row.get(8)?,
        created_at: time_column(row, 9)?,
    })
}

pub(crate) fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        group_id: row.get(1)?,
        nickname: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        password: row.get(5)?,
        image_url: row.get(6)?,
        tags: tags_column(row, 7)?,
        location: row.get(8)?,
        moment: row.get(9)?,
        is_public: row.get(10)?,
        like_count: row.get(11)?,
        comment_count: row.get(12)?,
        created_at: time_column(row, 13)?,
    })
}

pub(crate) fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        nickname: row.get(2)?,
        content: row.get(3)?,
        password: row.get(4)?,
        created_at: time_column(row, 5)?,
    })
}
