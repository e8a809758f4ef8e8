//! Database row types. These map directly to SQLite rows.
//! Distinct from referee-types view models to keep the DB layer independent.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Comment,
    Review,
    Annotation,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Review => "review",
            Self::Annotation => "annotation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub score: i64,
    pub approved: bool,
    pub approved_count: i64,
    pub created_at: String,
}

/// Author columns joined onto a post. Absent when the account was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRow {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub article_id: i64,
    pub author: Option<AuthorRow>,
    pub score: i64,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub post: PostRow,
    pub root_thread_id: Option<i64>,
    pub reply_to_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ReviewRow {
    pub post: PostRow,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct AnnotationRow {
    pub post: PostRow,
    pub review_id: i64,
    pub page_number: i64,
    pub selected_text: String,
}

#[derive(Debug, Clone)]
pub struct RegionRow {
    pub annotation_id: i64,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}
