//! Expert reviews: posting, status edits and the views readers see.

use anyhow::anyhow;
use referee_db::models::{PostKind, ReviewRow};
use referee_db::queries;
use referee_types::api::CreateReviewRequest;
use referee_types::models::{ExpertReview, ReviewStatus, UserReview};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::annotations;
use crate::approval::{approved_delta, reevaluate_approval};
use crate::directory::{ArticleDirectory, UserDirectory};
use crate::redact::{RedactionContext, redact_review_for_article};
use crate::threads::{followups, summary};
use crate::{Engine, Result, ServiceError};

const DUPLICATE_REVIEW: &str = "Expert has already reviewed this article.";

/// Assemble the reader-facing view of a review, unredacted.
pub fn review_view(conn: &Connection, row: &ReviewRow, with_followups: bool) -> anyhow::Result<ExpertReview> {
    let status: ReviewStatus = row
        .status
        .parse()
        .map_err(|e| anyhow!("review {} has corrupt status: {}", row.post.id, e))?;

    Ok(ExpertReview {
        post: summary(&row.post),
        status,
        followups: if with_followups {
            followups(conn, row.post.id)?
        } else {
            Vec::new()
        },
        inline_comments: annotations::inline_comments(conn, row.post.id, with_followups)?,
    })
}

/// A failed review write is reported to the caller as a rejected request.
fn persistence_failure(err: anyhow::Error) -> ServiceError {
    if queries::is_unique_violation(&err) {
        return ServiceError::invalid(DUPLICATE_REVIEW);
    }
    warn!("Review write rolled back: {:#}", err);
    ServiceError::invalid(format!("Review could not be saved: {err}"))
}

impl Engine {
    pub fn post_expert_review(
        &self,
        article_id: i64,
        expert_username: &str,
        review: &CreateReviewRequest,
    ) -> Result<ExpertReview> {
        self.db().with_tx(|tx| {
            let expert = tx
                .find_user(expert_username)?
                .ok_or_else(|| ServiceError::not_found("User does not exist."))?;
            let article = tx
                .article(article_id)?
                .ok_or_else(|| ServiceError::not_found("Article does not exist."))?;

            if article.approved {
                return Err(ServiceError::invalid(
                    "Article is already approved and accepts no further reviews.",
                ));
            }
            if queries::review_exists_for(tx, article_id, &expert.id)? {
                return Err(ServiceError::invalid(DUPLICATE_REVIEW));
            }
            if review.content.trim().is_empty() {
                return Err(ServiceError::invalid("Review is empty."));
            }
            let status: ReviewStatus = review
                .status
                .parse()
                .map_err(|_| ServiceError::invalid(format!("Unknown review status '{}'.", review.status)))?;
            for annotation in &review.inline_comments {
                annotations::validate(annotation)?;
            }

            let review_id = queries::insert_post(
                tx,
                PostKind::Review,
                Some(&expert.id),
                article_id,
                &review.content,
            )
            .map_err(persistence_failure)?;
            queries::insert_review(tx, review_id, article_id, &expert.id, status)
                .map_err(persistence_failure)?;
            annotations::insert_all(tx, review_id, &expert.id, article_id, &review.inline_comments)
                .map_err(persistence_failure)?;

            let outcome = reevaluate_approval(tx, article_id, approved_delta(None, status))
                .map_err(persistence_failure)?;

            info!(
                "Review {} by {} on article {}: {} ({} approving, approved={})",
                review_id, expert_username, article_id, status, outcome.approved_count, outcome.approved
            );

            let row = queries::query_review(tx, review_id)?
                .ok_or_else(|| ServiceError::not_found("Review vanished after insert."))?;
            let mut view = review_view(tx, &row, false)?;
            redact_review_for_article(tx, article_id, &mut view)?;
            Ok(view)
        })
    }

    /// Change the verdict of a review. Only its author may do so, and only
    /// while the article is still pending.
    pub fn edit_review_status(&self, actor_username: &str, review_id: i64, new_status: &str) -> Result<ExpertReview> {
        self.db().with_tx(|tx| {
            let row = queries::query_review(tx, review_id)?
                .ok_or_else(|| ServiceError::not_found("Review does not exist."))?;
            let article_id = row.post.article_id;

            if tx.is_approved(article_id)? {
                return Err(ServiceError::invalid(
                    "Article is already approved; review status is frozen.",
                ));
            }

            let is_author = row
                .post
                .author
                .as_ref()
                .is_some_and(|a| a.username == actor_username);
            if !is_author {
                warn!("{} tried to edit review {} they did not write", actor_username, review_id);
                return Err(ServiceError::not_authorized(
                    "Only the author of a review can change its status.",
                ));
            }

            let status: ReviewStatus = new_status
                .parse()
                .map_err(|_| ServiceError::invalid(format!("Unknown review status '{new_status}'.")))?;

            let previous: Option<ReviewStatus> = row.status.parse().ok();
            queries::update_review_status(tx, review_id, status)?;
            let outcome = reevaluate_approval(tx, article_id, approved_delta(previous, status))?;

            info!(
                "Review {} status set to {} ({} approving, approved={})",
                review_id, status, outcome.approved_count, outcome.approved
            );

            let row = queries::query_review(tx, review_id)?
                .ok_or_else(|| ServiceError::not_found("Review does not exist."))?;
            let mut view = review_view(tx, &row, true)?;
            redact_review_for_article(tx, article_id, &mut view)?;
            Ok(view)
        })
    }

    /// Every review of an article, oldest first, with annotations and followups.
    pub fn article_reviews(&self, article_id: i64) -> Result<Vec<ExpertReview>> {
        self.db()
            .with_conn(|conn| {
                if conn.article(article_id)?.is_none() {
                    return Ok(None);
                }

                let mut reviews = Vec::new();
                for row in queries::query_reviews_for_article(conn, article_id)? {
                    let mut view = review_view(conn, &row, true)?;
                    redact_review_for_article(conn, article_id, &mut view)?;
                    reviews.push(view);
                }
                Ok(Some(reviews))
            })?
            .ok_or_else(|| ServiceError::not_found("Article does not exist."))
    }

    pub fn review(&self, review_id: i64) -> Result<ExpertReview> {
        self.db()
            .with_conn(|conn| {
                let Some(row) = queries::query_review(conn, review_id)? else {
                    return Ok(None);
                };
                let mut view = review_view(conn, &row, true)?;
                redact_review_for_article(conn, row.post.article_id, &mut view)?;
                Ok(Some(view))
            })?
            .ok_or_else(|| ServiceError::not_found("Review does not exist."))
    }

    /// Reviews a user wrote, as listed on their profile.
    pub fn user_reviews(&self, username: &str) -> Result<Vec<UserReview>> {
        self.db()
            .with_conn(|conn| {
                let Some(user) = conn.find_user(username)? else {
                    return Ok(None);
                };

                let mut reviews = Vec::new();
                for row in queries::query_reviews_by_author(conn, &user.id)? {
                    let article_id = row.post.article_id;
                    let article_title = conn
                        .article(article_id)?
                        .map(|a| a.title)
                        .unwrap_or_default();
                    // the reviewer is the profile owner; replies from article authors stay blind
                    let mut review = review_view(conn, &row, true)?;
                    RedactionContext::load(conn, article_id)?.redact_replies(&mut review, conn)?;
                    reviews.push(UserReview {
                        review,
                        article_id,
                        article_title,
                    });
                }
                Ok(Some(reviews))
            })?
            .ok_or_else(|| ServiceError::not_found("User does not exist."))
    }
}
