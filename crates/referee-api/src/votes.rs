use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;

use referee_types::api::{Claims, VoteRequest, VoteResponse};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

pub async fn vote(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    debug!("{} votes {} on post {}", claims.username, req.direction, post_id);

    let engine = state.engine.clone();
    let score = blocking(move || engine.vote(post_id, &req.direction))
        .await?
        .map_err(ApiError::bad_request)?;

    Ok(Json(VoteResponse { post_id, score }))
}
