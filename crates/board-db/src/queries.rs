use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, params};

use board_types::models::{BadgeSet, EntityKind, GroupSort, PostSort};

use crate::models::{
    CommentChanges, CommentRow, GroupChanges, GroupFilter, GroupRow, NewComment, NewGroup,
    NewPost, PageRequest, PostChanges, PostFilter, PostRow,
};
use crate::store::{
    self, COMMENT_COLUMNS, GROUP_COLUMNS, POST_COLUMNS, comment_from_row, group_from_row,
    post_from_row,
};
use crate::{Database, StoreError, StoreResult, to_db_time};

impl Database {
    // -- Groups --

    pub fn get_group(&self, id: i64) -> StoreResult<Option<GroupRow>> {
        self.with_conn(|conn| store::get_group(conn, id))
    }

    /// Group plus its badge record, read under one lock so the two agree.
    pub fn get_group_with_badges(&self, id: i64) -> StoreResult<Option<(GroupRow, BadgeSet)>> {
        self.with_conn(|conn| {
            let Some(group) = store::get_group(conn, id)? else {
                return Ok(None);
            };
            let badges = store::get_badges(conn, id)?
                .ok_or_else(|| StoreError::not_found(EntityKind::Badge, id))?;
            Ok(Some((group, badges)))
        })
    }

    pub fn get_badges(&self, group_id: i64) -> StoreResult<Option<BadgeSet>> {
        self.with_conn(|conn| store::get_badges(conn, group_id))
    }

    pub fn update_group(&self, id: i64, changes: &GroupChanges) -> StoreResult<GroupRow> {
        self.with_tx(|tx| {
            update_group(tx, id, changes)?;
            store::get_group(tx, id)?.ok_or_else(|| StoreError::not_found(EntityKind::Group, id))
        })
    }

    pub fn list_groups(
        &self,
        filter: &GroupFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<GroupRow>, u64)> {
        self.with_conn(|conn| list_groups(conn, filter, page))
    }

    // -- Posts --

    pub fn get_post(&self, id: i64) -> StoreResult<Option<PostRow>> {
        self.with_conn(|conn| store::get_post(conn, id))
    }

    pub fn update_post(&self, id: i64, changes: &PostChanges) -> StoreResult<PostRow> {
        self.with_tx(|tx| {
            update_post(tx, id, changes)?;
            store::get_post(tx, id)?.ok_or_else(|| StoreError::not_found(EntityKind::Post, id))
        })
    }

    pub fn list_posts(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<PostRow>, u64)> {
        self.with_conn(|conn| list_posts(conn, filter, page))
    }

    // -- Comments --

    pub fn get_comment(&self, id: i64) -> StoreResult<Option<CommentRow>> {
        self.with_conn(|conn| store::get_comment(conn, id))
    }

    pub fn update_comment(&self, id: i64, changes: &CommentChanges) -> StoreResult<CommentRow> {
        self.with_tx(|tx| {
            update_comment(tx, id, changes)?;
            store::get_comment(tx, id)?
                .ok_or_else(|| StoreError::not_found(EntityKind::Comment, id))
        })
    }

    pub fn list_comments(
        &self,
        post_id: i64,
        page: PageRequest,
    ) -> StoreResult<(Vec<CommentRow>, u64)> {
        self.with_conn(|conn| list_comments(conn, post_id, page))
    }
}

// -- Groups --

/// Insert a group together with its all-false badge record.
pub fn insert_group(tx: &Transaction<'_>, new: &NewGroup, created_at: DateTime<Utc>) -> StoreResult<i64> {
    tx.execute(
        "INSERT INTO groups (name, password, image_url, is_public, introduction, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.name,
            new.password_hash,
            new.image_url,
            new.is_public,
            new.introduction,
            to_db_time(created_at),
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.execute("INSERT INTO badges (group_id) VALUES (?1)", [id])?;
    Ok(id)
}

pub fn update_group(conn: &Connection, id: i64, changes: &GroupChanges) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE groups SET
            name = COALESCE(?2, name),
            image_url = COALESCE(?3, image_url),
            is_public = COALESCE(?4, is_public),
            introduction = COALESCE(?5, introduction)
         WHERE id = ?1",
        params![
            id,
            changes.name,
            changes.image_url,
            changes.is_public,
            changes.introduction,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found(EntityKind::Group, id));
    }
    Ok(())
}

/// Deletes the group; its badge record, posts and comments cascade.
pub fn delete_group(conn: &Connection, id: i64) -> StoreResult<()> {
    let changed = conn.execute("DELETE FROM groups WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(StoreError::not_found(EntityKind::Group, id));
    }
    Ok(())
}

pub fn list_groups(
    conn: &Connection,
    filter: &GroupFilter,
    page: PageRequest,
) -> StoreResult<(Vec<GroupRow>, u64)> {
    let order = match filter.sort {
        GroupSort::Latest => "created_at DESC",
        GroupSort::MostPosted => "post_count DESC",
        GroupSort::MostLiked => "like_count DESC",
        GroupSort::MostBadge => "badge_count DESC",
    };
    let predicate = "is_public = ?1 AND (?2 IS NULL OR instr(name, ?2) > 0)";

    let sql = format!(
        "SELECT {GROUP_COLUMNS} FROM groups WHERE {predicate}
         ORDER BY {order}, id DESC LIMIT ?3 OFFSET ?4"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![filter.is_public, filter.keyword, page.page_size, page.offset()],
            group_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM groups WHERE {predicate}"),
        params![filter.is_public, filter.keyword],
        |row| row.get(0),
    )?;

    Ok((rows, total as u64))
}

// -- Posts --

/// Raw insert. Does not touch the group's `post_count`.
pub fn insert_post(conn: &Connection, new: &NewPost, created_at: DateTime<Utc>) -> StoreResult<i64> {
    let tags = serde_json::to_string(&new.tags)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO posts
            (group_id, nickname, title, content, password, image_url, tags, location, moment,
             is_public, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            new.group_id,
            new.nickname,
            new.title,
            new.content,
            new.password_hash,
            new.image_url,
            tags,
            new.location,
            new.moment,
            new.is_public,
            to_db_time(created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_post(conn: &Connection, id: i64, changes: &PostChanges) -> StoreResult<()> {
    let tags = changes
        .tags
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let changed = conn.execute(
        "UPDATE posts SET
            nickname = COALESCE(?2, nickname),
            title = COALESCE(?3, title),
            content = COALESCE(?4, content),
            image_url = COALESCE(?5, image_url),
            tags = COALESCE(?6, tags),
            location = COALESCE(?7, location),
            moment = COALESCE(?8, moment),
            is_public = COALESCE(?9, is_public)
         WHERE id = ?1",
        params![
            id,
            changes.nickname,
            changes.title,
            changes.content,
            changes.image_url,
            tags,
            changes.location,
            changes.moment,
            changes.is_public,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found(EntityKind::Post, id));
    }
    Ok(())
}

/// Raw delete; comments cascade. Does not touch the group's `post_count`.
pub fn delete_post(conn: &Connection, id: i64) -> StoreResult<()> {
    let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(StoreError::not_found(EntityKind::Post, id));
    }
    Ok(())
}

pub fn list_posts(
    conn: &Connection,
    filter: &PostFilter,
    page: PageRequest,
) -> StoreResult<(Vec<PostRow>, u64)> {
    let order = match filter.sort {
        PostSort::Latest => "created_at DESC",
        PostSort::MostCommented => "comment_count DESC",
        PostSort::MostLiked => "like_count DESC",
    };
    let predicate = "group_id = ?1 AND is_public = ?2 AND (?3 IS NULL
            OR instr(title, ?3) > 0
            OR EXISTS (SELECT 1 FROM json_each(posts.tags) WHERE json_each.value = ?3))";

    let sql = format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE {predicate}
         ORDER BY {order}, id DESC LIMIT ?4 OFFSET ?5"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![
                filter.group_id,
                filter.is_public,
                filter.keyword,
                page.page_size,
                page.offset()
            ],
            post_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM posts WHERE {predicate}"),
        params![filter.group_id, filter.is_public, filter.keyword],
        |row| row.get(0),
    )?;

    Ok((rows, total as u64))
}

// -- Comments --

/// Raw insert. Does not touch the post's `comment_count`.
pub fn insert_comment(
    conn: &Connection,
    new: &NewComment,
    created_at: DateTime<Utc>,
) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO comments (post_id, nickname, content, password, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.post_id,
            new.nickname,
            new.content,
            new.password_hash,
            to_db_time(created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_comment(conn: &Connection, id: i64, changes: &CommentChanges) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE comments SET
            nickname = COALESCE(?2, nickname),
            content = COALESCE(?3, content)
         WHERE id = ?1",
        params![id, changes.nickname, changes.content],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found(EntityKind::Comment, id));
    }
    Ok(())
}

/// Raw delete. Does not touch the post's `comment_count`.
pub fn delete_comment(conn: &Connection, id: i64) -> StoreResult<()> {
    let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(StoreError::not_found(EntityKind::Comment, id));
    }
    Ok(())
}

pub fn list_comments(
    conn: &Connection,
    post_id: i64,
    page: PageRequest,
) -> StoreResult<(Vec<CommentRow>, u64)> {
    let sql = format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ?1
         ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![post_id, page.page_size, page.offset()], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
        [post_id],
        |row| row.get(0),
    )?;

    Ok((rows, total as u64))
}
