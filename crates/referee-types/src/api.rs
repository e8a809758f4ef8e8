use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::HighlightSection;

// -- JWT Claims --

/// JWT claims issued by the external sign-in service. Canonical definition
/// lives here so the api middleware and its tests agree on the shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: String,
    pub exp: usize,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub root_thread_id: Option<i64>,
    #[serde(default)]
    pub reply_to_id: Option<i64>,
    pub content: String,
}

// -- Votes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    /// "up" or "down"; anything else is rejected by the voting engine.
    pub direction: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub post_id: i64,
    pub score: i64,
}

// -- Reviews --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReviewRequest {
    pub content: String,
    pub status: String,
    #[serde(default)]
    pub inline_comments: Vec<CreateInlineCommentRequest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateInlineCommentRequest {
    pub page_num: i64,
    #[serde(default)]
    pub selected_content: String,
    pub content: String,
    #[serde(default)]
    pub highlight_sections: Vec<HighlightSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditReviewStatusRequest {
    pub status: String,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
