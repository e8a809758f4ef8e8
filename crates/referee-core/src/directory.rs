//! Lookups the engine needs from systems it does not own: the user
//! directory, the expert registry and the article catalogue.
//!
//! All three are implemented over a SQLite connection, so they can be called
//! inside the same transaction as the write they guard.

use anyhow::Result;
use referee_db::models::{ArticleRow, UserRow};
use referee_db::queries;
use rusqlite::Connection;

pub trait UserDirectory {
    fn find_user(&self, username: &str) -> Result<Option<UserRow>>;
}

pub trait ExpertRegistry {
    /// Field of expertise for a registered expert.
    fn expert_field(&self, username: &str) -> Result<Option<String>>;
}

pub trait ArticleDirectory {
    fn article(&self, id: i64) -> Result<Option<ArticleRow>>;

    /// False for an unknown article.
    fn is_approved(&self, id: i64) -> Result<bool> {
        Ok(self.article(id)?.is_some_and(|a| a.approved))
    }

    fn author_usernames(&self, id: i64) -> Result<Vec<String>>;

    /// Mark the article approved. Returns false when it already was.
    fn set_approved(&self, id: i64) -> Result<bool>;
}

impl UserDirectory for Connection {
    fn find_user(&self, username: &str) -> Result<Option<UserRow>> {
        queries::query_user_by_username(self, username)
    }
}

impl ExpertRegistry for Connection {
    fn expert_field(&self, username: &str) -> Result<Option<String>> {
        queries::query_expert_field(self, username)
    }
}

impl ArticleDirectory for Connection {
    fn article(&self, id: i64) -> Result<Option<ArticleRow>> {
        queries::query_article(self, id)
    }

    fn author_usernames(&self, id: i64) -> Result<Vec<String>> {
        queries::query_article_authors(self, id)
    }

    fn set_approved(&self, id: i64) -> Result<bool> {
        queries::mark_article_approved(self, id)
    }
}
