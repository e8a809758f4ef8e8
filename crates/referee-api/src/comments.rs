use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use referee_core::comments::NewComment;
use referee_types::api::{Claims, CreateCommentRequest};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

pub async fn get_article_comments(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let threads = blocking(move || engine.article_comments(article_id)).await??;
    Ok(Json(threads))
}

pub async fn get_user_comments(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let comments = blocking(move || engine.user_comments(&username)).await??;
    Ok(Json(comments))
}

/// A post with its followups. Works for discussion comments, reviews and
/// inline annotations alike.
pub async fn get_thread(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let thread = blocking(move || engine.thread(post_id)).await??;
    Ok(Json(thread))
}

pub async fn post_comment(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let comment = NewComment {
        root_thread_id: req.root_thread_id,
        reply_to_id: req.reply_to_id,
        content: req.content,
    };

    let posted =
        blocking(move || engine.post_comment(&claims.username, article_id, &comment)).await??;
    Ok((StatusCode::CREATED, Json(posted)))
}
