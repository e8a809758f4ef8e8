//! Article approval state machine.
//!
//! An article is Pending until [`APPROVAL_THRESHOLD`] of its reviews carry
//! status Approved, then Approved for good. NeedsWork and Rejected reviews
//! neither count nor block.

use anyhow::{Result, anyhow};
use referee_db::queries;
use referee_types::models::ReviewStatus;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::directory::ArticleDirectory;

pub const APPROVAL_THRESHOLD: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalOutcome {
    pub approved_count: i64,
    pub approved: bool,
    /// True only for the evaluation that moved the article to Approved.
    pub transitioned: bool,
}

/// Next value of the approval flag. Once approved, always approved.
pub fn next_state(currently_approved: bool, approved_count: i64) -> bool {
    currently_approved || approved_count >= APPROVAL_THRESHOLD
}

/// Recount Approved reviews for the article, store the count on the article
/// and flip the flag when the threshold is reached. Must run in the same
/// transaction as the review write that triggered it.
///
/// `delta` is how the triggering write changed the number of
/// Approved reviews. The stored count plus the delta should equal the
/// recount; when it does not, the recount wins and the drift is logged.
pub fn reevaluate_approval(conn: &Connection, article_id: i64, delta: i64) -> Result<ApprovalOutcome> {
    let article = conn
        .article(article_id)?
        .ok_or_else(|| anyhow!("article {} vanished during approval", article_id))?;

    let approved_count = queries::count_approved_reviews(conn, article_id)?;
    let expected = article.approved_count + delta;
    if expected != approved_count {
        warn!(
            "Article {} approved_count drifted: stored {}, expected {}, recounted {}",
            article_id, article.approved_count, expected, approved_count
        );
    }
    queries::store_approved_count(conn, article_id, approved_count)?;

    let currently_approved = article.approved;
    let mut transitioned = false;
    if next_state(currently_approved, approved_count) && !currently_approved {
        transitioned = conn.set_approved(article_id)?;
        if transitioned {
            info!(
                "Article {} approved with {} approving reviews",
                article_id, approved_count
            );
        }
    }

    Ok(ApprovalOutcome {
        approved_count,
        approved: currently_approved || transitioned,
        transitioned,
    })
}

/// Change in the number of Approved reviews when one review moves from
/// `before` to `after`. `None` stands for a review that did not exist.
pub fn approved_delta(before: Option<ReviewStatus>, after: ReviewStatus) -> i64 {
    let approving = |s: ReviewStatus| i64::from(s == ReviewStatus::Approved);
    approving(after) - before.map_or(0, approving)
}
