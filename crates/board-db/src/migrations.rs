use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Board DB: running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE groups (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                password        TEXT NOT NULL,
                image_url       TEXT,
                is_public       INTEGER NOT NULL DEFAULT 1,
                introduction    TEXT,
                like_count      INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
                post_count      INTEGER NOT NULL DEFAULT 0 CHECK (post_count >= 0),
                badge_count     INTEGER NOT NULL DEFAULT 0 CHECK (badge_count BETWEEN 0 AND 5),
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_groups_listing ON groups(is_public, created_at);

            -- One row per group, created and deleted with it
            CREATE TABLE badges (
                group_id         INTEGER PRIMARY KEY REFERENCES groups(id) ON DELETE CASCADE,
                streak           INTEGER NOT NULL DEFAULT 0,
                volume           INTEGER NOT NULL DEFAULT 0,
                longevity        INTEGER NOT NULL DEFAULT 0,
                group_popularity INTEGER NOT NULL DEFAULT 0,
                post_popularity  INTEGER NOT NULL DEFAULT 0
            );

            CREATE TRIGGER badges_never_revoked
            BEFORE UPDATE ON badges
            WHEN (OLD.streak = 1 AND NEW.streak = 0)
              OR (OLD.volume = 1 AND NEW.volume = 0)
              OR (OLD.longevity = 1 AND NEW.longevity = 0)
              OR (OLD.group_popularity = 1 AND NEW.group_popularity = 0)
              OR (OLD.post_popularity = 1 AND NEW.post_popularity = 0)
            BEGIN
                SELECT RAISE(ABORT, 'badge flags cannot be revoked');
            END;

            CREATE TABLE posts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id        INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                nickname        TEXT NOT NULL,
                title           TEXT NOT NULL,
                content         TEXT NOT NULL,
                password        TEXT NOT NULL,
                image_url       TEXT,
                tags            TEXT NOT NULL DEFAULT '[]',
                location        TEXT,
                moment          TEXT,
                is_public       INTEGER NOT NULL DEFAULT 1,
                like_count      INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
                comment_count   INTEGER NOT NULL DEFAULT 0 CHECK (comment_count >= 0),
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_posts_group_created ON posts(group_id, created_at);
            CREATE INDEX idx_posts_group_likes ON posts(group_id, like_count);

            CREATE TABLE comments (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id         INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                nickname        TEXT NOT NULL,
                content         TEXT NOT NULL,
                password        TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_comments_post ON comments(post_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
