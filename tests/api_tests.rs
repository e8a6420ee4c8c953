//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use infocrumbs::db::Repository;
use infocrumbs::models::{NewCrumb, User};
use infocrumbs::payments::sign_payload;
use infocrumbs::web::{build_router, AppState, USER_HEADER};

const SECRET: &str = "whsec_integration";

struct TestApp {
    router: Router,
    repo: Arc<Repository>,
    user: User,
}

async fn setup() -> TestApp {
    let repo = Arc::new(Repository::in_memory().await.expect("in-memory database"));
    let user = repo
        .create_user("ada", "ada@example.com")
        .await
        .expect("create user");
    let state = AppState {
        repository: Arc::clone(&repo),
        stripe: None,
        webhook_secret: Some(SECRET.to_string()),
    };

    TestApp {
        router: build_router(state),
        repo,
        user,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str, user: Option<&User>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user.id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, user: Option<&User>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user.id.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn signed_webhook(body: &Value) -> Request<Body> {
    let payload = body.to_string();
    let signature = sign_payload(payload.as_bytes(), SECRET, Utc::now().timestamp());
    Request::builder()
        .method("POST")
        .uri("/checkout/wh/")
        .header("content-type", "application/json")
        .header("stripe-signature", signature)
        .body(Body::from(payload))
        .unwrap()
}

fn succeeded_event(id: &str, metadata: Value) -> Value {
    json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": {"object": {"id": id, "object": "payment_intent", "metadata": metadata}}
    })
}

async fn insert_crumbs(repo: &Repository, count: usize) {
    let topic = repo.get_topic_by_slug("music").await.unwrap().unwrap();
    for i in 0..count {
        repo.insert_crumb(NewCrumb {
            title: format!("Crumb {}", i),
            summary: "summary".into(),
            url: format!("https://example.com/{}", i),
            source: "Test".into(),
            topic_id: topic.id,
            published_at: Utc::now(),
        })
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let app = setup().await;
    let (status, body) = send(&app, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn replayed_webhook_keeps_one_subscription() {
    let app = setup().await;
    let event = succeeded_event(
        "pi_replay",
        json!({"plan_id": "1", "frequency_id": "1", "user_id": app.user.id.to_string()}),
    );

    let (first, _) = send(&app, signed_webhook(&event)).await;
    let (second, _) = send(&app, signed_webhook(&event)).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(app.repo.count_subscriptions().await.unwrap(), 1);
}

#[tokio::test]
async fn webhook_without_plan_metadata_is_rejected() {
    let app = setup().await;
    let event = succeeded_event("pi_bad", json!({"user_id": app.user.id.to_string()}));

    let (status, body) = send(&app, signed_webhook(&event)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("plan_id"));
    assert_eq!(app.repo.count_subscriptions().await.unwrap(), 0);
}

#[tokio::test]
async fn unsigned_webhook_is_rejected() {
    let app = setup().await;
    let request = Request::builder()
        .method("POST")
        .uri("/checkout/wh/")
        .body(Body::from(succeeded_event("pi_x", json!({})).to_string()))
        .unwrap();

    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unhandled_event_types_are_acknowledged() {
    let app = setup().await;
    let event = json!({"type": "customer.created", "data": {"object": {"id": "cus_1"}}});

    let (status, body) = send(&app, signed_webhook(&event)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Unhandled webhook received: customer.created");
}

#[tokio::test]
async fn default_plan_refuses_a_third_topic() {
    let app = setup().await;
    let topics = app.repo.list_topics().await.unwrap();
    let three: Vec<i64> = topics.iter().take(3).map(|t| t.id).collect();

    let (status, body) = send(
        &app,
        post_json("/api/preferences/", Some(&app.user), json!({"topics": three})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Your plan allows only 2 topics.");

    let (status, body) = send(
        &app,
        post_json("/api/preferences/", Some(&app.user), json!({"topics": &three[..2]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["selected_topic_ids"], json!(&three[..2]));
}

#[tokio::test]
async fn premium_subscribers_may_pick_every_topic() {
    let app = setup().await;
    let event = succeeded_event(
        "pi_premium",
        json!({"plan_id": "2", "frequency_id": "2", "user_id": app.user.id.to_string()}),
    );
    send(&app, signed_webhook(&event)).await;
    let all: Vec<i64> = app.repo.list_topics().await.unwrap().iter().map(|t| t.id).collect();

    let (status, body) = send(
        &app,
        post_json("/api/preferences/", Some(&app.user), json!({"topics": all})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["topic_limit"], Value::Null);
    assert_eq!(body["selected_topic_ids"].as_array().unwrap().len(), 9);

    let (_, status_body) = send(&app, get("/api/subscriptions/status/", Some(&app.user))).await;
    assert_eq!(status_body["plan"]["name"], "premium");
}

#[tokio::test]
async fn user_routes_require_a_known_user() {
    let app = setup().await;

    let (missing, _) = send(&app, get("/api/preferences/", None)).await;
    let unknown = Request::builder()
        .uri("/api/saved/")
        .header(USER_HEADER, "9999")
        .body(Body::empty())
        .unwrap();
    let (unknown, _) = send(&app, unknown).await;

    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn crumbs_are_paginated() {
    let app = setup().await;
    insert_crumbs(&app.repo, 12).await;

    let (status, first) = send(&app, get("/api/crumbs/", None)).await;
    let (_, second) = send(&app, get("/api/crumbs/?page=2", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page_len(&first), 10);
    assert_eq!(first["has_next"], true);
    assert_eq!(first["next_page"], 2);
    assert_eq!(page_len(&second), 2);
    assert_eq!(second["has_next"], false);
}

/// Crumbs on a page regardless of which side of midnight they fell.
fn page_len(page: &Value) -> usize {
    page["new"].as_array().map_or(0, Vec::len) + page["old"].as_array().map_or(0, Vec::len)
}

#[tokio::test]
async fn malformed_bodies_get_a_json_error() {
    let app = setup().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/preferences/")
        .header("content-type", "application/json")
        .header(USER_HEADER, app.user.id.to_string())
        .body(Body::from("{\"topics\": "))
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        post_json("/checkout/create-payment-intent/", Some(&app.user), json!({"plan_id": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn crumb_detail_saving_and_comments() {
    let app = setup().await;
    insert_crumbs(&app.repo, 1).await;
    let id = app.repo.list_crumbs(0, 1).await.unwrap()[0].id;

    let (status, detail) = send(&app, get(&format!("/api/crumbs/{}/", id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["topic_name"], "music");

    let (status, _) = send(&app, get("/api/crumbs/9999/", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, saved) = send(
        &app,
        post_json(&format!("/api/crumbs/{}/save/", id), Some(&app.user), json!({})),
    )
    .await;
    assert_eq!(saved["saved"], true);
    let (_, list) = send(&app, get("/api/saved/", Some(&app.user))).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let comments_uri = format!("/api/crumbs/{}/comments/", id);
    let (status, _) = send(
        &app,
        post_json(&comments_uri, Some(&app.user), json!({"content": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json(&comments_uri, Some(&app.user), json!({"content": "Great read"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, comments) = send(&app, get(&comments_uri, None)).await;
    assert_eq!(comments[0]["username"], "ada");
}

#[tokio::test]
async fn plans_are_listed_with_prices() {
    let app = setup().await;
    let (status, body) = send(&app, get("/api/subscriptions/plans/", None)).await;

    assert_eq!(status, StatusCode::OK);
    let prices = body["prices"].as_array().unwrap();
    assert_eq!(prices.len(), 6);
    assert!(prices
        .iter()
        .any(|p| p["plan"] == "premium" && p["frequency"] == "annually" && p["amount_pence"] == 36400));
}

#[tokio::test]
async fn checkout_validates_before_contacting_the_provider() {
    let app = setup().await;

    let (unknown, _) = send(
        &app,
        post_json(
            "/checkout/create-payment-intent/",
            Some(&app.user),
            json!({"plan_id": 42, "frequency_id": 1}),
        ),
    )
    .await;
    let (unconfigured, body) = send(
        &app,
        post_json(
            "/checkout/create-payment-intent/",
            Some(&app.user),
            json!({"plan_id": 1, "frequency_id": 1}),
        ),
    )
    .await;

    assert_eq!(unknown, StatusCode::NOT_FOUND);
    assert_eq!(unconfigured, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payments are not configured.");
}
