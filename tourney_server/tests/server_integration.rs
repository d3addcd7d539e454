//! Integration tests for the HTTP API.
//!
//! The router is driven with `oneshot` requests against an in-memory store;
//! access tokens are minted here with the shared secret.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tourney::{LedgerPolicy, MemoryStore};
use tourney_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use tourney_server::identity::{Claims, TokenVerifier};
use tower::ServiceExt; // For `oneshot` method

const SECRET: &str = "test_secret_key_for_testing_only_0123456789";
const OWNER: i64 = 11;
const STRANGER: i64 = 12;

fn test_app() -> axum::Router {
    create_router(
        AppState::new(Arc::new(MemoryStore::new()), TokenVerifier::new(SECRET))
            .with_share_base_url("https://brackets.example.com/"),
    )
}

fn token_for(user_id: i64) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        exp: (now + Duration::minutes(15)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

/// Send one request and return status plus decoded JSON body
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_tournament(app: &axum::Router, name: &str, max_players: i32) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/tournaments",
        Some(OWNER),
        Some(json!({ "name": name, "max_players": max_players })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

fn four_players() -> Value {
    json!({
        "players": [
            { "name": "A", "seed": 1 },
            { "name": "B", "seed": 2 },
            { "name": "C", "seed": 3 },
            { "name": "D", "seed": 4 }
        ]
    })
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(REQUEST_ID_HEADER, "trace-me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-me");
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/api/v1/tournaments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .uri("/api/v1/tournaments")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = test_app();
    let now = Utc::now();
    let claims = Claims {
        sub: OWNER,
        exp: (now - Duration::hours(1)).timestamp(),
        iat: (now - Duration::hours(2)).timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let request = Request::builder()
        .uri("/api/v1/tournaments")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Tournament Tests
// ============================================================================

#[tokio::test]
async fn test_tournament_lifecycle() {
    let app = test_app();
    let id = create_tournament(&app, "Spring Open", 8).await;

    // Public read
    let (status, body) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Spring Open");
    assert_eq!(body["status"], "draft");

    let (status, body) = send(&app, "GET", "/api/v1/tournaments", Some(OWNER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/tournaments/{id}"),
        Some(OWNER),
        Some(json!({ "name": "Spring Open 2026", "max_players": 16 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["max_players"], 16);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/start"),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    // Starting twice is not a valid transition
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/start"),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/end"),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/tournaments/{id}"),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Tournament not found");
}

#[tokio::test]
async fn test_cancel_tournament() {
    let app = test_app();
    let id = create_tournament(&app, "Rainy Day Cup", 4).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/cancel"),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
}

#[tokio::test]
async fn test_duplicate_tournament_name() {
    let app = test_app();
    create_tournament(&app, "Weekly", 4).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(OWNER),
        Some(json!({ "name": "Weekly", "max_players": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(OWNER),
        Some(json!({ "max_players": "many" })),
    )
    .await;
    assert!(status.is_client_error());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_share_url_and_ownership() {
    let app = test_app();
    let id = create_tournament(&app, "Shared", 4).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/share-url"),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["url"],
        format!("https://brackets.example.com/bracket/{id}")
    );

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/share-url"),
        Some(STRANGER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Not authorized to modify this tournament");
}

#[tokio::test]
async fn test_register_entries() {
    let app = test_app();
    let id = create_tournament(&app, "Entries", 2).await;
    let uri = format!("/api/v1/tournaments/{id}/entries");

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(OWNER),
        Some(json!({ "player_name": "Alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["seed_number"], 1);

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(OWNER),
        Some(json!({ "player_name": "Alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Player already added");

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(OWNER),
        Some(json!({ "player_name": "Bob", "seed_number": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(OWNER),
        Some(json!({ "player_name": "Carol" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Tournament is full");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/tournaments/{id}/details"),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries_count"], 2);
}

// ============================================================================
// Bracket Tests
// ============================================================================

#[tokio::test]
async fn test_bracket_flow() {
    let app = test_app();
    let id = create_tournament(&app, "Bracket Cup", 4).await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/tournaments/{id}/bracket"),
        Some(OWNER),
        Some(four_players()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["matchesCreated"], 3);

    let results = format!("/api/v1/tournaments/{id}/results");
    for (round, index, s1, s2) in [(0, 0, 11, 3), (0, 1, 3, 11)] {
        let (status, body) = send(
            &app,
            "POST",
            &results,
            Some(OWNER),
            Some(json!({ "round": round, "matchIndex": index, "score1": s1, "score2": s2 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["status"], "completed");
        assert_eq!(body["advancement"]["kind"], "placed");
    }

    let (status, body) = send(
        &app,
        "POST",
        &results,
        Some(OWNER),
        Some(json!({ "round": 1, "match_index": 0, "score1": 9, "score2": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["advancement"]["kind"], "terminal");

    // Anyone can read the bracket
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/tournaments/{id}/bracket"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rounds = body["bracket"].as_array().unwrap();
    assert_eq!(rounds.len(), 2);
    assert_eq!(rounds[0][0]["player1"]["name"], "A");
    assert_eq!(rounds[0][0]["player2"]["name"], "D");
    assert_eq!(rounds[1][0]["player1"]["name"], "A");
    assert_eq!(rounds[1][0]["player2"]["name"], "C");
    assert_eq!(body["champion"]["name"], "C");
}

#[tokio::test]
async fn test_empty_bracket_view() {
    let app = test_app();
    let id = create_tournament(&app, "Nothing Yet", 4).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/tournaments/{id}/bracket"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bracket"], json!([]));
    assert!(body["champion"].is_null());
}

#[tokio::test]
async fn test_snapshot_endpoint() {
    let app = test_app();
    let id = create_tournament(&app, "Snapshot Cup", 4).await;
    let uri = format!("/api/v1/tournaments/{id}/snapshot");

    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", &uri, Some(OWNER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/v1/tournaments/{id}/bracket"),
        Some(OWNER),
        Some(four_players()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &uri, Some(OWNER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tournament_id"], id);
    assert_eq!(body["last_updated_by"], OWNER);
    assert_eq!(body["bracket_data"].as_array().unwrap().len(), 2);

    let (status, _) = send(
        &app,
        "GET",
        "/api/v1/tournaments/9999/snapshot",
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bracket_errors() {
    let app = test_app();
    let id = create_tournament(&app, "Odd Numbers", 8).await;
    let uri = format!("/api/v1/tournaments/{id}/bracket");

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(OWNER),
        Some(json!({ "players": [
            { "name": "A", "seed": 1 },
            { "name": "B", "seed": 2 },
            { "name": "C", "seed": 3 }
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("power of two"));

    let (status, _) = send(&app, "PUT", &uri, Some(STRANGER), Some(four_players())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/tournaments/9999/bracket",
        Some(OWNER),
        Some(four_players()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bye_match_rejects_scores() {
    let app = test_app();
    let id = create_tournament(&app, "Three And A Bye", 4).await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/v1/tournaments/{id}/bracket"),
        Some(OWNER),
        Some(json!({ "players": [
            { "name": "A", "seed": 1 },
            { "name": "B", "seed": 2 },
            { "name": "C", "seed": 3 },
            { "name": "BYE", "seed": 0 }
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/results"),
        Some(OWNER),
        Some(json!({ "round": 0, "match_index": 0, "score1": 2, "score2": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot update scores for a BYE match");
}

#[tokio::test]
async fn test_missing_match_policy() {
    let store = Arc::new(MemoryStore::new());
    let strict = create_router(
        AppState::new(store.clone(), TokenVerifier::new(SECRET)).with_ledger_policy(
            LedgerPolicy {
                create_missing_matches: false,
            },
        ),
    );
    let id = create_tournament(&strict, "Strict", 4).await;

    let (status, _) = send(
        &strict,
        "POST",
        &format!("/api/v1/tournaments/{id}/results"),
        Some(OWNER),
        Some(json!({ "round": 0, "match_index": 0, "score1": 2, "score2": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Same store, default policy: a placeholder match is created
    let lenient = create_router(AppState::new(store, TokenVerifier::new(SECRET)));
    let (status, body) = send(
        &lenient,
        "POST",
        &format!("/api/v1/tournaments/{id}/results"),
        Some(OWNER),
        Some(json!({ "round": 0, "match_index": 0, "score1": 2, "score2": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn test_results_outside_bracket_are_bad_requests() {
    let app = test_app();
    let id = create_tournament(&app, "Small Bracket", 4).await;
    let uri = format!("/api/v1/tournaments/{id}/results");

    for body in [
        json!({ "round": 2147483646u32, "match_index": 0, "score1": 2, "score2": 1 }),
        json!({ "round": 0, "match_index": 2147483646u32, "score1": 2, "score2": 1 }),
        json!({ "round": 4999999, "match_index": 0, "score1": 1, "score2": 1 }),
    ] {
        let (status, response) = send(&app, "POST", &uri, Some(OWNER), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].as_str().unwrap().contains("out of range"));
    }

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/tournaments/{id}/bracket"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bracket"], json!([]));
}
