use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

use referee_core::ServiceError;
use referee_types::api::{Claims, CreateReviewRequest, EditReviewStatusRequest};
use referee_types::models::EXPERT_ROLE;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

pub async fn get_article_reviews(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let reviews = blocking(move || engine.article_reviews(article_id)).await??;
    Ok(Json(reviews))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let review = blocking(move || engine.review(review_id)).await??;
    Ok(Json(review))
}

pub async fn get_user_reviews(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let reviews = blocking(move || engine.user_reviews(&username)).await??;
    Ok(Json(reviews))
}

/// Only tokens carrying the expert role may review.
pub async fn post_review(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.role != EXPERT_ROLE {
        warn!("{} ({}) tried to review article {}", claims.username, claims.role, article_id);
        return Err(ServiceError::not_authorized("Only experts can post reviews.").into());
    }

    let engine = state.engine.clone();
    let review =
        blocking(move || engine.post_expert_review(article_id, &claims.username, &req)).await??;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn edit_review_status(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditReviewStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let review = blocking(move || engine.edit_review_status(&claims.username, review_id, &req.status))
        .await?
        .map_err(ApiError::bad_request)?;
    Ok(Json(review))
}
