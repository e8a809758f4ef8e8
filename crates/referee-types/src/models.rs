use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role label stored for registered experts.
pub const EXPERT_ROLE: &str = "Expert";

/// Role label shown for a listed author of the article being viewed.
pub const AUTHOR_ROLE: &str = "Author";

/// Replacement identity for article authors before the article is approved.
pub const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised value '{0}'")]
pub struct UnknownValue(pub String);

/// Verdict an expert attaches to a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    Approved,
    #[serde(rename = "Needs Work")]
    NeedsWork,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::NeedsWork => "Needs Work",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Approved" => Ok(Self::Approved),
            "Needs Work" => Ok(Self::NeedsWork),
            "Rejected" => Ok(Self::Rejected),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn delta(&self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl FromStr for VoteDirection {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

/// Rectangle in document pixel coordinates. Several regions describe one
/// selection that wraps across lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSection {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Identity shown next to a post, after redaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commenter {
    pub username: String,
    pub name: String,
    pub role: String,
}

/// Fields every post kind shares. `author` is `None` once the author account
/// has been removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub author: Option<Commenter>,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupComment {
    #[serde(flatten)]
    pub post: PostSummary,
    pub replying_to: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopLevelComment {
    #[serde(flatten)]
    pub post: PostSummary,
    pub followups: Vec<FollowupComment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineComment {
    #[serde(flatten)]
    pub post: PostSummary,
    pub followups: Vec<FollowupComment>,
    pub page_num: u32,
    pub selected_content: String,
    pub highlight_sections: Vec<HighlightSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertReview {
    #[serde(flatten)]
    pub post: PostSummary,
    pub status: ReviewStatus,
    pub followups: Vec<FollowupComment>,
    pub inline_comments: Vec<InlineComment>,
}

/// A discussion comment as listed on its author's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserComment {
    #[serde(flatten)]
    pub post: PostSummary,
    pub article_id: i64,
    pub article_title: String,
}

/// A review as listed on its author's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReview {
    #[serde(flatten)]
    pub review: ExpertReview,
    pub article_id: i64,
    pub article_title: String,
}

/// Result of posting a discussion comment: a new thread or a reply in one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostedComment {
    TopLevel(TopLevelComment),
    Followup(FollowupComment),
}
