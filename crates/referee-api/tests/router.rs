use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use referee_api::auth::{AppStateInner, issue_token};
use referee_api::routes::router;
use referee_core::Engine;
use referee_db::Database;
use referee_types::models::EXPERT_ROLE;

const SECRET: &str = "router-test-secret";

struct App {
    router: Router,
    article: i64,
}

fn app() -> App {
    let db = Database::open_in_memory().unwrap();
    db.create_user("ada", "Ada Lovelace", "User").unwrap();
    db.create_user("bob", "Bob Reader", "User").unwrap();
    for (username, field) in [("e1", "Physics"), ("e2", "Chemistry"), ("e3", "Biology")] {
        db.create_user(username, username, EXPERT_ROLE).unwrap();
        db.register_expert(username, field).unwrap();
    }
    let article = db.create_article("Analytical Engines", &["ada"]).unwrap();

    let state = Arc::new(AppStateInner {
        engine: Engine::new(Arc::new(db)),
        jwt_secret: SECRET.into(),
    });
    App {
        router: router(state),
        article,
    }
}

fn token(username: &str, role: &str) -> String {
    issue_token(SECRET, Uuid::new_v4(), username, role, chrono::Duration::hours(1)).unwrap()
}

async fn send(app: &App, method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = auth {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn writes_require_a_valid_token() {
    let app = app();
    let uri = format!("/articles/{}/comments", app.article);
    let body = json!({ "content": "hello" });

    let (status, _) = send(&app, Method::POST, &uri, None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = issue_token("another-secret", Uuid::new_v4(), "bob", "User", chrono::Duration::hours(1)).unwrap();
    let (status, _) = send(&app, Method::POST, &uri, Some(&forged), Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // reads stay open
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn comment_thread_round_trip() {
    let app = app();
    let uri = format!("/articles/{}/comments", app.article);
    let bob = token("bob", "User");
    let ada = token("ada", "User");

    let (status, root) = send(&app, Method::POST, &uri, Some(&bob), Some(json!({ "content": "Question on §2" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(root["followups"], json!([]));
    let root_id = root["id"].as_i64().unwrap();

    let (status, reply) = send(
        &app,
        Method::POST,
        &uri,
        Some(&ada),
        Some(json!({ "root_thread_id": root_id, "reply_to_id": root_id, "content": "See appendix" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["replying_to"], root_id);
    assert_eq!(reply["author"]["username"], "Anonymous");
    assert_eq!(reply["author"]["role"], "Author");

    let (status, thread) = send(&app, Method::GET, &format!("/posts/{root_id}/thread"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["followups"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::POST, &uri, Some(&bob), Some(json!({ "content": "" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, mine) = send(&app, Method::GET, "/users/bob/comments", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine[0]["article_title"], "Analytical Engines");

    let (status, _) = send(&app, Method::GET, "/articles/999/comments", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn voting_maps_errors_to_bad_request() {
    let app = app();
    let bob = token("bob", "User");
    let (_, root) = send(
        &app,
        Method::POST,
        &format!("/articles/{}/comments", app.article),
        Some(&bob),
        Some(json!({ "content": "vote me" })),
    )
    .await;
    let vote_uri = format!("/posts/{}/vote", root["id"]);

    let (status, body) = send(&app, Method::POST, &vote_uri, Some(&bob), Some(json!({ "direction": "up" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 1);

    let (status, body) = send(&app, Method::POST, &vote_uri, Some(&bob), Some(json!({ "direction": "sideways" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, Method::POST, "/posts/4242/vote", Some(&bob), Some(json!({ "direction": "up" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn review_workflow_over_http() {
    let app = app();
    let reviews_uri = format!("/articles/{}/expert-reviews", app.article);

    // readers cannot review
    let (status, _) = send(
        &app,
        Method::POST,
        &reviews_uri,
        Some(&token("bob", "User")),
        Some(json!({ "content": "looks fine", "status": "Approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, first) = send(
        &app,
        Method::POST,
        &reviews_uri,
        Some(&token("e1", EXPERT_ROLE)),
        Some(json!({
            "content": "Needs a control group.",
            "status": "Needs Work",
            "inline_comments": [{
                "page_num": 3,
                "selected_content": "Table 1",
                "content": "Units missing",
                "highlight_sections": [{ "x": 1, "y": 2, "width": 30, "height": 10 }]
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["status"], "Needs Work");
    assert_eq!(first["author"]["role"], "Expert in Physics");
    assert_eq!(first["inline_comments"][0]["highlight_sections"][0]["width"], 30);
    let first_id = first["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        &reviews_uri,
        Some(&token("e1", EXPERT_ROLE)),
        Some(json!({ "content": "again", "status": "Approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let status_uri = format!("/expert-reviews/{first_id}/status");
    let (status, _) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&token("e2", EXPERT_ROLE)),
        Some(json!({ "status": "Approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&token("e1", EXPERT_ROLE)),
        Some(json!({ "status": "Perfect" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, edited) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&token("e1", EXPERT_ROLE)),
        Some(json!({ "status": "Approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["status"], "Approved");

    for expert in ["e2", "e3"] {
        let (status, _) = send(
            &app,
            Method::POST,
            &reviews_uri,
            Some(&token(expert, EXPERT_ROLE)),
            Some(json!({ "content": "Convincing.", "status": "Approved" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, listed) = send(&app, Method::GET, &reviews_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|r| r["status"] == "Approved"));

    // frozen once approved
    let (status, _) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&token("e1", EXPERT_ROLE)),
        Some(json!({ "status": "Rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, single) = send(&app, Method::GET, &format!("/expert-reviews/{first_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(single["inline_comments"][0]["page_num"], 3);

    let (status, profile) = send(&app, Method::GET, "/users/e1/expert-reviews", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile[0]["article_id"], app.article);

    let (status, _) = send(&app, Method::GET, "/expert-reviews/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
