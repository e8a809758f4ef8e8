use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (directory tables)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                name        TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'User',
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE experts (
                username    TEXT PRIMARY KEY REFERENCES users(username) ON DELETE CASCADE,
                field       TEXT NOT NULL
            );

            CREATE TABLE articles (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                score           INTEGER NOT NULL DEFAULT 0,
                approved        INTEGER NOT NULL DEFAULT 0,
                approved_count  INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE article_authors (
                article_id  INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
                username    TEXT NOT NULL,
                PRIMARY KEY (article_id, username)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (posts)");
        conn.execute_batch(
            "
            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                kind        TEXT NOT NULL CHECK (kind IN ('comment', 'review', 'annotation')),
                author_id   TEXT REFERENCES users(id) ON DELETE SET NULL,
                article_id  INTEGER NOT NULL REFERENCES articles(id),
                score       INTEGER NOT NULL DEFAULT 0,
                content     TEXT NOT NULL CHECK (length(content) > 0),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_posts_article ON posts(article_id, kind);
            CREATE INDEX idx_posts_author ON posts(author_id, kind);

            CREATE TABLE discussion_comments (
                post_id         INTEGER PRIMARY KEY REFERENCES posts(id) ON DELETE CASCADE,
                root_thread_id  INTEGER REFERENCES posts(id),
                reply_to_id     INTEGER REFERENCES posts(id),
                CHECK ((root_thread_id IS NULL) = (reply_to_id IS NULL))
            );

            CREATE INDEX idx_comments_root ON discussion_comments(root_thread_id);

            -- article_id/author_id are copied from posts so the one-review-per-expert
            -- rule can be a storage constraint.
            CREATE TABLE expert_reviews (
                post_id     INTEGER PRIMARY KEY REFERENCES posts(id) ON DELETE CASCADE,
                article_id  INTEGER NOT NULL REFERENCES articles(id),
                author_id   TEXT REFERENCES users(id) ON DELETE SET NULL,
                status      TEXT NOT NULL CHECK (status IN ('Approved', 'Needs Work', 'Rejected')),
                UNIQUE(article_id, author_id)
            );

            CREATE INDEX idx_reviews_article_status ON expert_reviews(article_id, status);

            CREATE TABLE inline_annotations (
                post_id         INTEGER PRIMARY KEY REFERENCES posts(id) ON DELETE CASCADE,
                review_id       INTEGER NOT NULL REFERENCES expert_reviews(post_id) ON DELETE CASCADE,
                page_number     INTEGER NOT NULL CHECK (page_number >= 0),
                selected_text   TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX idx_annotations_review ON inline_annotations(review_id);

            CREATE TABLE highlight_regions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                annotation_id   INTEGER NOT NULL REFERENCES inline_annotations(post_id) ON DELETE CASCADE,
                x               INTEGER NOT NULL,
                y               INTEGER NOT NULL,
                width           INTEGER NOT NULL,
                height          INTEGER NOT NULL
            );

            CREATE INDEX idx_regions_annotation ON highlight_regions(annotation_id);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
