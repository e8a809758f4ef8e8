//! Rebuilds conversation trees from flat comment rows.
//!
//! A thread is a root post plus the flat list of comments whose
//! `root_thread_id` names it, oldest first. Replies to replies stay in the
//! same list; `reply_to_id` is only carried along as `replying_to`.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use referee_db::models::{CommentRow, PostRow};
use referee_db::queries;
use referee_types::models::{Commenter, FollowupComment, PostSummary, TopLevelComment, UserComment};
use rusqlite::Connection;
use tracing::warn;

use crate::directory::{ArticleDirectory, UserDirectory};
use crate::redact::RedactionContext;
use crate::{Engine, ServiceError};

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS[.fff]" without timezone.
pub(crate) fn parse_timestamp(raw: &str, post_id: i64) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|ndt| ndt.and_utc())
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on post {}: {}", raw, post_id, e);
            DateTime::default()
        })
}

pub(crate) fn summary(row: &PostRow) -> PostSummary {
    PostSummary {
        id: row.id,
        author: row.author.as_ref().map(|a| Commenter {
            username: a.username.clone(),
            name: a.name.clone(),
            role: a.role.clone(),
        }),
        score: row.score,
        created_at: parse_timestamp(&row.created_at, row.id),
        content: row.content.clone(),
    }
}

pub(crate) fn followup_view(row: &CommentRow) -> FollowupComment {
    FollowupComment {
        post: summary(&row.post),
        replying_to: row.reply_to_id,
    }
}

/// Direct followups of any post. Never fails on an empty thread.
pub fn followups(conn: &Connection, root_id: i64) -> Result<Vec<FollowupComment>> {
    Ok(queries::query_followups(conn, root_id)?
        .iter()
        .map(followup_view)
        .collect())
}

/// A post and its followups, unredacted.
pub fn thread_view(conn: &Connection, root: &PostRow) -> Result<TopLevelComment> {
    Ok(TopLevelComment {
        post: summary(root),
        followups: followups(conn, root.id)?,
    })
}

impl Engine {
    /// Thread rooted at any post: a discussion comment, a review or an
    /// annotation.
    pub fn thread(&self, post_id: i64) -> crate::Result<TopLevelComment> {
        self.db().with_conn(|conn| {
            let Some(root) = queries::query_post(conn, post_id)? else {
                return Ok(None);
            };
            let mut view = thread_view(conn, &root)?;
            RedactionContext::load(conn, root.article_id)?.redact_thread(&mut view, conn)?;
            Ok(Some(view))
        })?
        .ok_or_else(|| ServiceError::not_found("Post does not exist."))
    }

    /// Every top-level discussion comment on an article with its followups.
    pub fn article_comments(&self, article_id: i64) -> crate::Result<Vec<TopLevelComment>> {
        self.db()
            .with_conn(|conn| {
                if conn.article(article_id)?.is_none() {
                    return Ok(None);
                }

                let ctx = RedactionContext::load(conn, article_id)?;
                let mut threads = Vec::new();
                for root in queries::query_top_level_comments(conn, article_id)? {
                    let mut view = thread_view(conn, &root.post)?;
                    ctx.redact_thread(&mut view, conn)?;
                    threads.push(view);
                }
                Ok(Some(threads))
            })?
            .ok_or_else(|| ServiceError::not_found("Article does not exist."))
    }

    /// Discussion comments a user wrote, across all articles, as shown on
    /// their profile.
    pub fn user_comments(&self, username: &str) -> crate::Result<Vec<UserComment>> {
        self.db()
            .with_conn(|conn| {
                let Some(user) = conn.find_user(username)? else {
                    return Ok(None);
                };

                let comments = queries::query_comments_by_author(conn, &user.id)?
                    .into_iter()
                    .map(|(row, article_title)| UserComment {
                        post: summary(&row.post),
                        article_id: row.post.article_id,
                        article_title,
                    })
                    .collect();
                Ok(Some(comments))
            })?
            .ok_or_else(|| ServiceError::not_found("User does not exist."))
    }
}
