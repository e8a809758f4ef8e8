use crate::Database;
use crate::models::{
    AnnotationRow, ArticleRow, AuthorRow, CommentRow, PostKind, PostRow, RegionRow, ReviewRow,
    UserRow,
};
use anyhow::Result;
use referee_types::models::{HighlightSection, ReviewStatus};
use rusqlite::{Connection, Row};
use tracing::info;
use uuid::Uuid;

/// Shared projection for every post query. Column order is what `read_post`
/// expects; kind-specific columns are appended after index 8.
const POST_SELECT: &str = "SELECT p.id, p.article_id, p.author_id, u.username, u.name, u.role,
            p.score, p.content, p.created_at
     FROM posts p
     LEFT JOIN users u ON u.id = p.author_id";

const COMMENT_SELECT: &str = "SELECT p.id, p.article_id, p.author_id, u.username, u.name, u.role,
            p.score, p.content, p.created_at, c.root_thread_id, c.reply_to_id
     FROM posts p
     JOIN discussion_comments c ON c.post_id = p.id
     LEFT JOIN users u ON u.id = p.author_id";

const REVIEW_SELECT: &str = "SELECT p.id, p.article_id, p.author_id, u.username, u.name, u.role,
            p.score, p.content, p.created_at, r.status
     FROM posts p
     JOIN expert_reviews r ON r.post_id = p.id
     LEFT JOIN users u ON u.id = p.author_id";

impl Database {
    // -- Directory (seeded by the signup/admin side) --

    pub fn create_user(&self, username: &str, name: &str, role: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.with_tx(|tx| insert_user(tx, &id, username, name, role))?;
        Ok(id)
    }

    /// Remove an account. Posts survive with a null author.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        self.with_tx(|tx| {
            let removed = tx.execute("DELETE FROM users WHERE username = ?1", [username])?;
            Ok(removed > 0)
        })
    }

    pub fn register_expert(&self, username: &str, field: &str) -> Result<()> {
        self.with_tx(|tx| insert_expert(tx, username, field))
    }

    pub fn create_article(&self, title: &str, author_usernames: &[&str]) -> Result<i64> {
        self.with_tx(|tx| insert_article(tx, title, author_usernames))
    }

    pub fn get_article(&self, id: i64) -> Result<Option<ArticleRow>> {
        self.with_conn(|conn| query_article(conn, id))
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Wipe every post and reset article approval. Test/reset affordance only.
    pub fn delete_all_posts(&self) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute_batch(
                "
                DELETE FROM highlight_regions;
                DELETE FROM inline_annotations;
                DELETE FROM discussion_comments;
                DELETE FROM expert_reviews;
                DELETE FROM posts;
                UPDATE articles SET approved = 0, approved_count = 0;
                ",
            )?;
            info!("All posts deleted");
            Ok(())
        })
    }
}

// -- Users / experts --

pub fn insert_user(conn: &Connection, id: &str, username: &str, name: &str, role: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, name, role) VALUES (?1, ?2, ?3, ?4)",
        (id, username, name, role),
    )?;
    Ok(())
}

pub fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn
        .prepare("SELECT id, username, name, role, created_at FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                name: row.get(2)?,
                role: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

pub fn insert_expert(conn: &Connection, username: &str, field: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO experts (username, field) VALUES (?1, ?2)
         ON CONFLICT(username) DO UPDATE SET field = excluded.field",
        (username, field),
    )?;
    Ok(())
}

pub fn query_expert_field(conn: &Connection, username: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT field FROM experts WHERE username = ?1",
        [username],
        |row| row.get(0),
    )
    .optional()
}

// -- Articles --

pub fn insert_article(conn: &Connection, title: &str, author_usernames: &[&str]) -> Result<i64> {
    conn.execute("INSERT INTO articles (title) VALUES (?1)", [title])?;
    let id = conn.last_insert_rowid();

    for username in author_usernames {
        conn.execute(
            "INSERT OR IGNORE INTO article_authors (article_id, username) VALUES (?1, ?2)",
            rusqlite::params![id, username],
        )?;
    }

    Ok(id)
}

pub fn query_article(conn: &Connection, id: i64) -> Result<Option<ArticleRow>> {
    conn.query_row(
        "SELECT id, title, score, approved, approved_count, created_at FROM articles WHERE id = ?1",
        [id],
        |row| {
            Ok(ArticleRow {
                id: row.get(0)?,
                title: row.get(1)?,
                score: row.get(2)?,
                approved: row.get(3)?,
                approved_count: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )
    .optional()
}

pub fn query_article_authors(conn: &Connection, article_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT username FROM article_authors WHERE article_id = ?1 ORDER BY username",
    )?;
    let rows = stmt
        .query_map([article_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(rows)
}

/// Flip `approved` on. Returns true only for the call that changed it.
pub fn mark_article_approved(conn: &Connection, article_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE articles SET approved = 1 WHERE id = ?1 AND approved = 0",
        [article_id],
    )?;
    Ok(changed > 0)
}

pub fn store_approved_count(conn: &Connection, article_id: i64, count: i64) -> Result<()> {
    conn.execute(
        "UPDATE articles SET approved_count = ?1 WHERE id = ?2",
        rusqlite::params![count, article_id],
    )?;
    Ok(())
}

// -- Posts --

pub fn insert_post(
    conn: &Connection,
    kind: PostKind,
    author_id: Option<&str>,
    article_id: i64,
    content: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO posts (kind, author_id, article_id, content) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![kind.as_str(), author_id, article_id, content],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn query_post(conn: &Connection, id: i64) -> Result<Option<PostRow>> {
    let sql = format!("{POST_SELECT} WHERE p.id = ?1");
    conn.query_row(&sql, [id], read_post).optional()
}

pub fn post_exists_in_article(conn: &Connection, id: i64, article_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1 AND article_id = ?2)",
        [id, article_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Atomic score increment. `None` when the post does not exist.
pub fn add_to_score(conn: &Connection, id: i64, delta: i64) -> Result<Option<i64>> {
    conn.query_row(
        "UPDATE posts SET score = score + ?1 WHERE id = ?2 RETURNING score",
        [delta, id],
        |row| row.get(0),
    )
    .optional()
}

// -- Discussion comments --

pub fn insert_comment(
    conn: &Connection,
    post_id: i64,
    root_thread_id: Option<i64>,
    reply_to_id: Option<i64>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO discussion_comments (post_id, root_thread_id, reply_to_id) VALUES (?1, ?2, ?3)",
        rusqlite::params![post_id, root_thread_id, reply_to_id],
    )?;
    Ok(())
}

pub fn query_comment(conn: &Connection, post_id: i64) -> Result<Option<CommentRow>> {
    let sql = format!("{COMMENT_SELECT} WHERE p.id = ?1");
    conn.query_row(&sql, [post_id], read_comment).optional()
}

/// Followups of a root post, oldest first. Membership is decided by
/// `root_thread_id` alone; `reply_to_id` never changes the list.
pub fn query_followups(conn: &Connection, root_thread_id: i64) -> Result<Vec<CommentRow>> {
    let sql = format!("{COMMENT_SELECT} WHERE c.root_thread_id = ?1 ORDER BY p.created_at, p.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([root_thread_id], read_comment)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn query_top_level_comments(conn: &Connection, article_id: i64) -> Result<Vec<CommentRow>> {
    let sql = format!(
        "{COMMENT_SELECT}
         WHERE p.article_id = ?1 AND c.root_thread_id IS NULL
         ORDER BY p.created_at, p.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([article_id], read_comment)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every discussion comment written by a user, paired with the article title.
pub fn query_comments_by_author(
    conn: &Connection,
    author_id: &str,
) -> Result<Vec<(CommentRow, String)>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.article_id, p.author_id, u.username, u.name, u.role,
                p.score, p.content, p.created_at, c.root_thread_id, c.reply_to_id, a.title
         FROM posts p
         JOIN discussion_comments c ON c.post_id = p.id
         JOIN articles a ON a.id = p.article_id
         LEFT JOIN users u ON u.id = p.author_id
         WHERE p.author_id = ?1
         ORDER BY p.created_at, p.id",
    )?;
    let rows = stmt
        .query_map([author_id], |row| Ok((read_comment(row)?, row.get(11)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Expert reviews --

pub fn insert_review(
    conn: &Connection,
    post_id: i64,
    article_id: i64,
    author_id: &str,
    status: ReviewStatus,
) -> Result<()> {
    conn.execute(
        "INSERT INTO expert_reviews (post_id, article_id, author_id, status) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![post_id, article_id, author_id, status.as_str()],
    )?;
    Ok(())
}

pub fn review_exists_for(conn: &Connection, article_id: i64, author_id: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM expert_reviews WHERE article_id = ?1 AND author_id = ?2)",
        rusqlite::params![article_id, author_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn query_review(conn: &Connection, post_id: i64) -> Result<Option<ReviewRow>> {
    let sql = format!("{REVIEW_SELECT} WHERE p.id = ?1");
    conn.query_row(&sql, [post_id], read_review).optional()
}

pub fn query_reviews_for_article(conn: &Connection, article_id: i64) -> Result<Vec<ReviewRow>> {
    let sql = format!("{REVIEW_SELECT} WHERE r.article_id = ?1 ORDER BY p.created_at, p.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([article_id], read_review)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn query_reviews_by_author(conn: &Connection, author_id: &str) -> Result<Vec<ReviewRow>> {
    let sql = format!("{REVIEW_SELECT} WHERE p.author_id = ?1 ORDER BY p.created_at, p.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([author_id], read_review)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_review_status(conn: &Connection, post_id: i64, status: ReviewStatus) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE expert_reviews SET status = ?1 WHERE post_id = ?2",
        rusqlite::params![status.as_str(), post_id],
    )?;
    Ok(changed > 0)
}

pub fn count_approved_reviews(conn: &Connection, article_id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM expert_reviews WHERE article_id = ?1 AND status = ?2",
        rusqlite::params![article_id, ReviewStatus::Approved.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

// -- Inline annotations --

pub fn insert_annotation(
    conn: &Connection,
    post_id: i64,
    review_id: i64,
    page_number: i64,
    selected_text: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO inline_annotations (post_id, review_id, page_number, selected_text)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![post_id, review_id, page_number, selected_text],
    )?;
    Ok(())
}

pub fn insert_region(conn: &Connection, annotation_id: i64, region: &HighlightSection) -> Result<()> {
    conn.execute(
        "INSERT INTO highlight_regions (annotation_id, x, y, width, height) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![annotation_id, region.x, region.y, region.width, region.height],
    )?;
    Ok(())
}

pub fn query_annotations(conn: &Connection, review_id: i64) -> Result<Vec<AnnotationRow>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.article_id, p.author_id, u.username, u.name, u.role,
                p.score, p.content, p.created_at, i.review_id, i.page_number, i.selected_text
         FROM posts p
         JOIN inline_annotations i ON i.post_id = p.id
         LEFT JOIN users u ON u.id = p.author_id
         WHERE i.review_id = ?1
         ORDER BY p.created_at, p.id",
    )?;
    let rows = stmt
        .query_map([review_id], |row| {
            Ok(AnnotationRow {
                post: read_post(row)?,
                review_id: row.get(9)?,
                page_number: row.get(10)?,
                selected_text: row.get(11)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Batch-fetch highlight regions for a set of annotation IDs.
pub fn query_regions(conn: &Connection, annotation_ids: &[i64]) -> Result<Vec<RegionRow>> {
    if annotation_ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (1..=annotation_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT annotation_id, x, y, width, height FROM highlight_regions
         WHERE annotation_id IN ({})
         ORDER BY id",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = annotation_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let rows = stmt
        .query_map(params.as_slice(), |row| {
            Ok(RegionRow {
                annotation_id: row.get(0)?,
                x: row.get(1)?,
                y: row.get(2)?,
                width: row.get(3)?,
                height: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// True when `err` came from a UNIQUE constraint rejecting an insert.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// -- Row readers --

fn read_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    let author_id: Option<String> = row.get(2)?;
    let author = match author_id {
        Some(id) => Some(AuthorRow {
            id,
            username: row.get(3)?,
            name: row.get(4)?,
            role: row.get(5)?,
        }),
        None => None,
    };

    Ok(PostRow {
        id: row.get(0)?,
        article_id: row.get(1)?,
        author,
        score: row.get(6)?,
        content: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn read_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        post: read_post(row)?,
        root_thread_id: row.get(9)?,
        reply_to_id: row.get(10)?,
    })
}

fn read_review(row: &Row<'_>) -> rusqlite::Result<ReviewRow> {
    Ok(ReviewRow {
        post: read_post(row)?,
        status: row.get(9)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
