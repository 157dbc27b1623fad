//! API integration tests.
//!
//! These tests drive the router end to end against a migrated in-memory
//! database and a manual clock.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware,
    response::Response,
};
use chrono::{Duration, TimeZone, Utc};
use rtr_api::{AppState, identity_middleware, middleware::IdentityHeaders, router as api_router};
use rtr_common::{ManualClock, config::BattleConfig};
use rtr_core::{BattleService, NoOpAnalyticsSink};
use rtr_db::test_utils::TestDatabase;
use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    _db: Option<TestDatabase>,
    clock: Arc<ManualClock>,
    router: Router,
}

fn battle_config() -> BattleConfig {
    BattleConfig {
        max_duration_hours: 720,
        trending_recency_bonus: 10,
        default_trending_window: "24h".to_string(),
        default_trending_limit: 12,
    }
}

fn build_router(conn: Arc<DatabaseConnection>, clock: Arc<ManualClock>) -> Router {
    let service = BattleService::from_config(
        conn,
        clock,
        &battle_config(),
        Arc::new(NoOpAnalyticsSink),
    )
    .unwrap();
    let state = AppState::new(service, IdentityHeaders::default());

    api_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ))
        .with_state(state)
}

/// Create a test app over an in-memory database.
async fn create_test_app() -> TestApp {
    let db = TestDatabase::in_memory().await.expect("in-memory database");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap(),
    ));
    let router = build_router(db.connection(), clock.clone());

    TestApp {
        _db: Some(db),
        clock,
        router,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .unwrap()
}

fn movie_battle(a: i64, b: i64) -> Value {
    json!({
        "title": "Movie night",
        "type": "movie",
        "optionA": {"id": a, "title": format!("Movie {a}"), "poster_path": "/a.jpg"},
        "optionB": {"id": b, "title": format!("Movie {b}")},
        "durationHours": 24
    })
}

async fn create_battle(app: &TestApp, body: &Value) -> String {
    let (status, body) = send(app, post_json("/battles", body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_create_battle_returns_created() {
    let app = create_test_app().await;
    let (status, body) = send(&app, post_json("/battles", &movie_battle(1, 2))).await;

    assert_eq!(status, StatusCode::CREATED);
    let battle = &body["data"];
    assert_eq!(battle["title"], "Movie night");
    assert_eq!(battle["type"], "movie");
    assert_eq!(battle["isActive"], true);
    assert_eq!(battle["optionA"]["id"], 1);
    assert_eq!(battle["options"]["a"]["displayName"], "Movie 1");
    assert!(battle["endsAt"].is_string());
}

#[tokio::test]
async fn test_create_battle_defaults_to_custom() {
    let app = create_test_app().await;
    let body = json!({
        "title": "Lunch",
        "optionA": {"identifier": "ramen"},
        "optionB": {"identifier": "pho"}
    });
    let (status, body) = send(&app, post_json("/battles", &body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["type"], "custom");
    assert!(body["data"]["endsAt"].is_null());
}

#[tokio::test]
async fn test_create_battle_with_identical_options_is_rejected() {
    let app = create_test_app().await;
    let (status, body) = send(&app, post_json("/battles", &movie_battle(5, 5))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, listed) = send(&app, get("/battles?active=false")).await;
    assert_eq!(listed["data"], json!([]));
}

#[tokio::test]
async fn test_create_battle_validation_errors() {
    let app = create_test_app().await;

    let mut empty_title = movie_battle(1, 2);
    empty_title["title"] = json!("");
    let (status, body) = send(&app, post_json("/battles", &empty_title)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let mut bad_type = movie_battle(1, 2);
    bad_type["type"] = json!("podcast");
    let (status, _) = send(&app, post_json("/battles", &bad_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_duration = movie_battle(1, 2);
    bad_duration["durationHours"] = json!(0);
    let (status, _) = send(&app, post_json("/battles", &bad_duration)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_uses_error_format() {
    let app = create_test_app().await;
    let request = Request::builder()
        .uri("/battles")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from("{invalid json}"))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_vote_lifecycle() {
    let app = create_test_app().await;
    let id = create_battle(&app, &movie_battle(1, 2)).await;
    let votes_uri = format!("/battles/{id}/votes");

    let (status, body) = send(
        &app,
        post_json(&votes_uri, &json!({"voterId": "s1", "choice": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["choice"], "A");
    assert_eq!(body["data"]["voterId"], "s1");

    let (status, body) = send(
        &app,
        post_json(&votes_uri, &json!({"voterId": "s1", "choice": "B"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_VOTE");
    assert_eq!(body["error"]["retryable"], false);

    let (status, _) = send(
        &app,
        post_json(&votes_uri, &json!({"voterId": "s2", "choice": "B"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, get(&format!("/battles/{id}?voterId=s1"))).await;
    assert_eq!(status, StatusCode::OK);
    let view = &body["data"];
    assert_eq!(view["status"], "OPEN");
    assert_eq!(view["tally"]["countA"], 1);
    assert_eq!(view["tally"]["countB"], 1);
    assert_eq!(view["tally"]["percentA"], 50);
    assert_eq!(view["tally"]["winner"], "UNDECIDED");
    assert_eq!(view["remainingSeconds"], 24 * 3600);
    assert_eq!(view["myVote"]["choice"], "A");

    app.clock.advance(Duration::hours(25));

    let (status, body) = send(
        &app,
        post_json(&votes_uri, &json!({"voterId": "s3", "choice": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"]["code"], "BATTLE_CLOSED");

    let (_, body) = send(&app, get(&format!("/battles/{id}"))).await;
    assert_eq!(body["data"]["status"], "CLOSED");
    assert_eq!(body["data"]["tally"]["winner"], "TIE");
    assert!(body["data"].get("myVote").is_none());
}

#[tokio::test]
async fn test_vote_on_unknown_battle_is_not_found() {
    let app = create_test_app().await;
    let (status, body) = send(
        &app,
        post_json("/battles/nope/votes", &json!({"voterId": "s1", "choice": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "BATTLE_NOT_FOUND");

    let (status, _) = send(&app, get("/battles/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vote_requires_identity_and_valid_choice() {
    let app = create_test_app().await;
    let id = create_battle(&app, &movie_battle(1, 2)).await;
    let votes_uri = format!("/battles/{id}/votes");

    let (status, body) = send(&app, post_json(&votes_uri, &json!({"choice": "A"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        post_json(&votes_uri, &json!({"voterId": "s1", "choice": "C"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json(&votes_uri, &json!({"voterId": "account:7", "choice": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_identity_headers() {
    let app = create_test_app().await;
    let id = create_battle(&app, &movie_battle(1, 2)).await;
    let votes_uri = format!("/battles/{id}/votes");

    let by_session = Request::builder()
        .uri(&votes_uri)
        .method("POST")
        .header("Content-Type", "application/json")
        .header("X-Session-Id", "sess-9")
        .body(Body::from(json!({"choice": "B"}).to_string()))
        .unwrap();
    let (status, body) = send(&app, by_session).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["voterId"], "sess-9");

    // The account header wins over a body token.
    let by_account = Request::builder()
        .uri(&votes_uri)
        .method("POST")
        .header("Content-Type", "application/json")
        .header("X-Authenticated-User", "sess-9")
        .body(Body::from(json!({"voterId": "other", "choice": "A"}).to_string()))
        .unwrap();
    let (status, body) = send(&app, by_account).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["voterId"], "account:sess-9");

    let view = Request::builder()
        .uri(format!("/battles/{id}"))
        .method("GET")
        .header("X-Authenticated-User", "sess-9")
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(&app, view).await;
    assert_eq!(body["data"]["myVote"]["choice"], "A");
    assert_eq!(body["data"]["tally"]["total"], 2);

    let spoofed = Request::builder()
        .uri(format!("/battles/{id}"))
        .method("GET")
        .header("X-Session-Id", "account:sess-9")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, spoofed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_identity_only_rejected_where_used() {
    let app = create_test_app().await;
    let id = create_battle(&app, &movie_battle(1, 2)).await;

    let with_bad_identity = |method: &str, uri: &str, body: Body| {
        Request::builder()
            .uri(uri)
            .method(method)
            .header("Content-Type", "application/json")
            .header("X-Session-Id", "account:forged")
            .body(body)
            .unwrap()
    };

    let (status, _) = send(&app, with_bad_identity("GET", "/health", Body::empty())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, with_bad_identity("GET", "/battles", Body::empty())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let vote = Body::from(json!({"choice": "A"}).to_string());
    let (status, body) = send(
        &app,
        with_bad_identity("POST", &format!("/battles/{id}/votes"), vote),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_list_battles_filters() {
    let app = create_test_app().await;
    create_battle(&app, &movie_battle(1, 2)).await;
    app.clock.advance(Duration::minutes(1));
    create_battle(
        &app,
        &json!({
            "title": "Fiction",
            "type": "book",
            "optionA": {"id": "vol-1", "title": "Dune"},
            "optionB": {"id": "vol-2", "title": "Emma"}
        }),
    )
    .await;

    let (status, body) = send(&app, get("/battles")).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Fiction", "Movie night"]);

    let (_, body) = send(&app, get("/battles?type=movie")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, get("/battles?limit=1")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, get("/battles?type=podcast")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app, get("/battles?limit=lots")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_trending_endpoint() {
    let app = create_test_app().await;
    let quiet = create_battle(&app, &movie_battle(1, 2)).await;
    let busy = create_battle(&app, &movie_battle(3, 4)).await;
    for voter in ["a", "b"] {
        let (status, _) = send(
            &app,
            post_json(
                &format!("/battles/{busy}/votes"),
                &json!({"voterId": voter, "choice": "A"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, get("/battles/trending?window=24h&limit=12")).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["battle"]["id"], busy.as_str());
    assert_eq!(entries[0]["totalVotes"], 2);
    assert_eq!(entries[0]["activityScore"], 12);
    assert_eq!(entries[1]["battle"]["id"], quiet.as_str());
    assert_eq!(entries[1]["activityScore"], 10);

    let (status, body) = send(&app, get("/battles/trending?window=fortnight")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_deactivate_battle() {
    let app = create_test_app().await;
    let id = create_battle(&app, &movie_battle(1, 2)).await;

    let path = format!("/battles/{id}/deactivate");
    let (status, body) = send(&app, post_json(&path, &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], false);

    let (status, _) = send(&app, post_json(&format!("/battles/{id}/deactivate"), &json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post_json(
            &format!("/battles/{id}/votes"),
            &json!({"voterId": "s1", "choice": "A"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);

    let (status, _) = send(&app, post_json("/battles/missing/deactivate", &json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_failure_returns_service_unavailable() {
    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors([DbErr::Custom("connection reset by peer".to_string())])
        .into_connection();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let app = TestApp {
        _db: None,
        router: build_router(Arc::new(conn), clock.clone()),
        clock,
    };

    let (status, body) = send(&app, get("/battles/b1")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");
    assert_eq!(body["error"]["retryable"], true);
    assert!(
        !body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("connection reset")
    );
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_app().await;
    let (status, body) = send(&app, get("/nonexistent/endpoint")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("/nonexistent/endpoint")
    );
}
