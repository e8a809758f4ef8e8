use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{get, post, put},
};

use crate::auth::AppState;
use crate::middleware::require_auth;
use crate::{comments, reviews, votes};

/// All routes. Reads are public; writes need a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/articles/{article_id}/comments", get(comments::get_article_comments))
        .route("/articles/{article_id}/expert-reviews", get(reviews::get_article_reviews))
        .route("/expert-reviews/{review_id}", get(reviews::get_review))
        .route("/users/{username}/comments", get(comments::get_user_comments))
        .route("/users/{username}/expert-reviews", get(reviews::get_user_reviews))
        .route("/posts/{post_id}/thread", get(comments::get_thread))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/articles/{article_id}/comments", post(comments::post_comment))
        .route("/articles/{article_id}/expert-reviews", post(reviews::post_review))
        .route("/posts/{post_id}/vote", post(votes::vote))
        .route("/expert-reviews/{review_id}/status", put(reviews::edit_review_status))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
