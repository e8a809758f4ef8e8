use referee_db::models::PostKind;
use referee_db::queries;
use referee_types::models::{PostedComment, TopLevelComment};
use rusqlite::Connection;
use tracing::info;

use crate::directory::{ArticleDirectory, UserDirectory};
use crate::redact::RedactionContext;
use crate::threads::{followup_view, summary};
use crate::{Engine, Result, ServiceError};

/// A discussion comment to be posted. Both references are `None` for a new
/// thread; a reply names the thread root and the post it answers.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub root_thread_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub content: String,
}

impl Engine {
    pub fn post_comment(
        &self,
        author_username: &str,
        article_id: i64,
        comment: &NewComment,
    ) -> Result<PostedComment> {
        self.db().with_tx(|tx| {
            let author = tx
                .find_user(author_username)?
                .ok_or_else(|| ServiceError::not_found("User does not exist."))?;
            if tx.article(article_id)?.is_none() {
                return Err(ServiceError::not_found("Article does not exist."));
            }

            check_references(tx, article_id, comment)?;

            if comment.content.trim().is_empty() {
                return Err(ServiceError::invalid("Comment is empty."));
            }

            let post_id = queries::insert_post(
                tx,
                PostKind::Comment,
                Some(&author.id),
                article_id,
                &comment.content,
            )?;
            queries::insert_comment(tx, post_id, comment.root_thread_id, comment.reply_to_id)?;

            let row = queries::query_comment(tx, post_id)?
                .ok_or_else(|| ServiceError::not_found("Comment vanished after insert."))?;
            let ctx = RedactionContext::load(&**tx, article_id)?;

            info!(
                "Comment {} posted on article {} (root {:?})",
                post_id, article_id, comment.root_thread_id
            );

            if row.root_thread_id.is_none() {
                let mut view = TopLevelComment {
                    post: summary(&row.post),
                    followups: Vec::new(),
                };
                ctx.redact_thread(&mut view, &**tx)?;
                Ok(PostedComment::TopLevel(view))
            } else {
                let mut view = followup_view(&row);
                ctx.redact_followup(&mut view, &**tx)?;
                Ok(PostedComment::Followup(view))
            }
        })
    }
}

/// Replies must name both the thread root and the post being answered, both
/// on the same article. The root must itself start a thread: replies are
/// flattened under the original root, never nested under another reply.
fn check_references(conn: &Connection, article_id: i64, comment: &NewComment) -> Result<()> {
    let (root, reply_to) = match (comment.root_thread_id, comment.reply_to_id) {
        (None, None) => return Ok(()),
        (Some(root), Some(reply_to)) => (root, reply_to),
        _ => {
            return Err(ServiceError::invalid(
                "A reply must set both root_thread_id and reply_to_id.",
            ));
        }
    };

    for id in [root, reply_to] {
        if !queries::post_exists_in_article(conn, id, article_id)? {
            return Err(ServiceError::not_found("Referenced Comment does not exist."));
        }
    }

    if let Some(parent) = queries::query_comment(conn, root)? {
        if parent.root_thread_id.is_some() {
            return Err(ServiceError::invalid(
                "root_thread_id must reference the first post of a thread.",
            ));
        }
    }

    if reply_to != root {
        let in_thread = queries::query_comment(conn, reply_to)?
            .is_some_and(|c| c.root_thread_id == Some(root));
        if !in_thread {
            return Err(ServiceError::invalid(
                "reply_to_id must be the thread root or one of its followups.",
            ));
        }
    }

    Ok(())
}
