//! Display identity for post authors.
//!
//! Listed authors of an article are shown as "Anonymous" until the article is
//! approved, so reviews stay blind. Experts are labelled with their field and
//! are never anonymized. Everyone else is shown as stored.

use std::collections::HashSet;

use anyhow::Result;
use referee_types::models::{
    ANONYMOUS, AUTHOR_ROLE, Commenter, EXPERT_ROLE, ExpertReview, FollowupComment, InlineComment,
    PostSummary, TopLevelComment,
};
use rusqlite::Connection;
use tracing::warn;

use crate::directory::{ArticleDirectory, ExpertRegistry};

/// Everything the redaction rule needs to know about one article.
#[derive(Debug, Clone)]
pub struct RedactionContext {
    approved: bool,
    authors: HashSet<String>,
}

impl RedactionContext {
    pub fn new(approved: bool, authors: impl IntoIterator<Item = String>) -> Self {
        Self {
            approved,
            authors: authors.into_iter().collect(),
        }
    }

    /// Read the approval flag and author list for an article. A missing
    /// article yields a context that changes nothing but expert labels.
    pub fn load<D: ArticleDirectory + ?Sized>(directory: &D, article_id: i64) -> Result<Self> {
        let approved = directory
            .article(article_id)?
            .map(|a| a.approved)
            .unwrap_or(false);
        let authors = directory.author_usernames(article_id)?;
        Ok(Self::new(approved, authors))
    }

    /// Apply the rule to a single identity.
    pub fn redact<R: ExpertRegistry + ?Sized>(&self, author: &mut Commenter, experts: &R) -> Result<()> {
        if self.authors.contains(&author.username) {
            if !self.approved {
                author.username = ANONYMOUS.to_string();
                author.name = ANONYMOUS.to_string();
            }
            author.role = AUTHOR_ROLE.to_string();
        } else if author.role == EXPERT_ROLE {
            match experts.expert_field(&author.username)? {
                Some(field) => author.role = format!("Expert in {field}"),
                None => warn!("Expert '{}' has no registered field", author.username),
            }
        }
        Ok(())
    }

    fn redact_post<R: ExpertRegistry + ?Sized>(&self, post: &mut PostSummary, experts: &R) -> Result<()> {
        match post.author.as_mut() {
            Some(author) => self.redact(author, experts),
            None => Ok(()),
        }
    }

    fn redact_followups<R: ExpertRegistry + ?Sized>(
        &self,
        followups: &mut [FollowupComment],
        experts: &R,
    ) -> Result<()> {
        for followup in followups {
            self.redact_post(&mut followup.post, experts)?;
        }
        Ok(())
    }

    pub fn redact_followup<R: ExpertRegistry + ?Sized>(
        &self,
        followup: &mut FollowupComment,
        experts: &R,
    ) -> Result<()> {
        self.redact_post(&mut followup.post, experts)
    }

    pub fn redact_thread<R: ExpertRegistry + ?Sized>(
        &self,
        thread: &mut TopLevelComment,
        experts: &R,
    ) -> Result<()> {
        self.redact_post(&mut thread.post, experts)?;
        self.redact_followups(&mut thread.followups, experts)
    }

    pub fn redact_inline<R: ExpertRegistry + ?Sized>(
        &self,
        inline: &mut InlineComment,
        experts: &R,
    ) -> Result<()> {
        self.redact_post(&mut inline.post, experts)?;
        self.redact_followups(&mut inline.followups, experts)
    }

    /// Redact the review author, its followups, every annotation and every
    /// annotation's followups.
    pub fn redact_review<R: ExpertRegistry + ?Sized>(
        &self,
        review: &mut ExpertReview,
        experts: &R,
    ) -> Result<()> {
        self.redact_post(&mut review.post, experts)?;
        self.redact_followups(&mut review.followups, experts)?;
        for inline in &mut review.inline_comments {
            self.redact_inline(inline, experts)?;
        }
        Ok(())
    }

    /// Redact only the replies on a review: its followups and those of each
    /// annotation. The review and annotation authors keep their stored identity.
    pub fn redact_replies<R: ExpertRegistry + ?Sized>(
        &self,
        review: &mut ExpertReview,
        experts: &R,
    ) -> Result<()> {
        self.redact_followups(&mut review.followups, experts)?;
        for inline in &mut review.inline_comments {
            self.redact_followups(&mut inline.followups, experts)?;
        }
        Ok(())
    }
}

/// Load the article's context and redact a whole review in one call.
pub fn redact_review_for_article(
    conn: &Connection,
    article_id: i64,
    review: &mut ExpertReview,
) -> Result<()> {
    RedactionContext::load(conn, article_id)?.redact_review(review, conn)
}
