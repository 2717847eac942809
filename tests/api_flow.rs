// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end tests driving the full router over HTTP requests:
//! signup → login → bearer token → role gate → workflow → store readback.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use software_war_server::{
    api::router,
    auth::TokenIssuer,
    state::AppState,
    storage::Database,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

struct Account {
    id: String,
    token: String,
}

async fn register(app: &Router, username: &str, role: &str) -> Account {
    let (status, user) = send(
        app,
        Method::POST,
        "/users/signup",
        None,
        Some(json!({ "username": username, "password": "correct horse", "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup {username}: {user}");

    let (status, session) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login {username}: {session}");

    Account {
        id: user["id"].as_str().unwrap().to_string(),
        token: session["access_token"].as_str().unwrap().to_string(),
    }
}

async fn capture(app: &Router, captor: &Account, developer: &Account) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/victims/create",
        Some(&captor.token),
        Some(json!({ "developerId": developer.id, "skills": ["python"], "lastSeen": "PyCon" })),
    )
    .await
}

// ---------------------------------------------------------------------------
// Sessions and role gates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_and_bad_tokens_are_unauthenticated() {
    let app = router(AppState::for_tests());

    let (status, body) = send(&app, Method::GET, "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "unauthenticated");

    let (status, body) = send(&app, Method::GET, "/users/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "malformed_token");
}

#[tokio::test]
async fn token_from_another_secret_is_rejected() {
    let state = AppState::for_tests();
    let app = router(state.clone());
    let dev = register(&app, "neo", "developer").await;

    let user = software_war_server::storage::UserRepository::new(&state.db)
        .get(&dev.id)
        .unwrap();
    let forged = TokenIssuer::new(b"someone-else", 3600).issue(&user).unwrap();

    let (status, body) = send(&app, Method::GET, "/users/me", Some(&forged.token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "invalid_signature");
}

#[tokio::test]
async fn role_gates_apply_per_route() {
    let app = router(AppState::for_tests());
    let juan = register(&app, "juan", "juan").await;
    let slave = register(&app, "agent", "slave").await;
    let dev = register(&app, "neo", "developer").await;

    let (status, body) = send(&app, Method::GET, "/users", Some(&slave.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "insufficient_role");

    let (status, users) = send(&app, Method::GET, "/users", Some(&juan.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 3);
    assert!(users[0].get("passwordHash").is_none());

    let (status, _) = send(&app, Method::GET, "/feedback/resistance-tips", Some(&slave.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/victims", Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, me) = send(&app, Method::GET, "/users/me", Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "developer");
}

#[tokio::test]
async fn public_routes_need_no_session() {
    let app = router(AppState::for_tests());

    let (status, board) = send(&app, Method::GET, "/rewards/leaderboard", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board, json!([]));

    let (status, health) = send(&app, Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["checks"]["database"], "ok");
}

// ---------------------------------------------------------------------------
// Capture workflow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn capture_then_recapture() {
    let app = router(AppState::for_tests());
    let juan = register(&app, "juan", "juan").await;
    let s1 = register(&app, "s1", "slave").await;
    let s2 = register(&app, "s2", "slave").await;
    let d1 = register(&app, "d1", "developer").await;

    let (status, victim) = capture(&app, &s1, &d1).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(victim["capturedBy"], s1.id.as_str());
    assert_eq!(victim["transformationStatus"], "captured");

    let (status, body) = capture(&app, &s2, &d1).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "already_victim");

    let (_, ranking) = send(&app, Method::GET, "/users/leaderboard", Some(&juan.token), None).await;
    assert_eq!(ranking[0]["id"], s1.id.as_str());
    assert_eq!(ranking[0]["captureCount"], 1);
    assert_eq!(ranking[1]["captureCount"], 0);

    let (_, available) = send(&app, Method::GET, "/users/available", Some(&s2.token), None).await;
    assert_eq!(available, json!([]));
    let (_, captured) = send(&app, Method::GET, "/users/victims", Some(&s2.token), None).await;
    assert_eq!(captured[0]["isVictim"], true);
}

#[tokio::test]
async fn capturing_a_non_developer_is_not_found() {
    let app = router(AppState::for_tests());
    let s1 = register(&app, "s1", "slave").await;
    let s2 = register(&app, "s2", "slave").await;

    let (status, body) = capture(&app, &s1, &s2).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "not_found");
}

#[tokio::test]
async fn demoted_slave_with_stale_token_cannot_self_capture() {
    let app = router(AppState::for_tests());
    let juan = register(&app, "juan", "juan").await;
    let turncoat = register(&app, "turncoat", "slave").await;

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/users/{}", turncoat.id),
        Some(&juan.token),
        Some(json!({ "role": "developer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The slave session issued before the role change still passes the gate.
    let (status, body) = capture(&app, &turncoat, &turncoat).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "bad_request");

    let (status, user) = send(
        &app,
        Method::GET,
        &format!("/users/{}", turncoat.id),
        Some(&juan.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["isVictim"], false);
    assert_eq!(user["captureCount"], 0);

    let (status, _) = capture(&app, &juan, &turncoat).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = capture(&app, &juan, &turncoat).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "already_victim");
}

#[tokio::test]
async fn captor_ownership_with_admin_override() {
    let app = router(AppState::for_tests());
    let juan = register(&app, "juan", "juan").await;
    let s1 = register(&app, "s1", "slave").await;
    let s2 = register(&app, "s2", "slave").await;
    let d1 = register(&app, "d1", "developer").await;

    let (_, victim) = capture(&app, &s1, &d1).await;
    let uri = format!("/victims/{}", victim["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&s2.token),
        Some(json!({ "transformationStatus": "in_progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "forbidden");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&s1.token),
        Some(json!({ "capturedBy": s2.id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "bad_request");

    let (status, updated) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&juan.token),
        Some(json!({ "transformationStatus": "transformed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["transformationStatus"], "transformed");
    assert!(updated["completionDate"].is_string());

    let (status, _) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&s1.token),
        Some(json!({ "transformationStatus": "resisting" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&s1.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&juan.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, events) = send(
        &app,
        Method::GET,
        "/audit/events?event_type=permission_denied",
        Some(&juan.token),
        None,
    )
    .await;
    assert_eq!(events["total"], 1);
}

#[tokio::test]
async fn free_text_status_is_kept_as_label() {
    let app = router(AppState::for_tests());
    let s1 = register(&app, "s1", "slave").await;
    let d1 = register(&app, "d1", "developer").await;

    let (status, victim) = send(
        &app,
        Method::POST,
        "/victims/create",
        Some(&s1.token),
        Some(json!({ "developerId": d1.id, "transformationStatus": "Learning Pandas" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(victim["transformationStatus"], "captured");
    assert_eq!(victim["statusLabel"], "Learning Pandas");
}

// ---------------------------------------------------------------------------
// Feedback votes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn vote_sequence_over_http() {
    let app = router(AppState::for_tests());
    let e = register(&app, "e", "developer").await;
    let f = register(&app, "f", "developer").await;
    let g = register(&app, "g", "developer").await;

    let (status, post) = send(
        &app,
        Method::POST,
        "/feedback",
        Some(&e.token),
        Some(json!({ "title": "Use Rust", "message": "They cannot parse it", "type": "survival_story" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/feedback/{}/vote", post["id"].as_str().unwrap());

    let vote = |account: &Account, vote_type: &str| {
        let token = account.token.clone();
        let body = json!({ "voteType": vote_type });
        let uri = uri.clone();
        let app = app.clone();
        async move { send(&app, Method::PATCH, &uri, Some(&token), Some(body)).await }
    };

    vote(&e, "upvote").await;
    vote(&f, "downvote").await;
    let (_, after) = vote(&e, "downvote").await;
    assert_eq!((after["upvotes"].clone(), after["downvotes"].clone()), (json!(0), json!(2)));

    let (_, after) = vote(&g, "upvote").await;
    assert_eq!(after["upvotes"], 1);
    assert_eq!(after["downvotes"], 2);

    let (_, after) = vote(&g, "upvote").await;
    assert_eq!(after["upvotes"], 0);
    assert_eq!(after["upvoters"], json!([]));

    let (status, _) = vote(&g, "sideways").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Rewards and leaderboard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn leaderboard_and_monthly_awards() {
    let app = router(AppState::for_tests());
    let juan = register(&app, "juan", "juan").await;
    let s1 = register(&app, "s1", "slave").await;
    let s2 = register(&app, "s2", "slave").await;
    let d1 = register(&app, "d1", "developer").await;
    let d2 = register(&app, "d2", "developer").await;

    capture(&app, &s2, &d1).await;
    capture(&app, &s2, &d2).await;

    let (status, run) = send(
        &app,
        Method::POST,
        "/rewards/admin/auto-award-monthly",
        Some(&juan.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["awarded"].as_array().unwrap().len(), 2);

    let (_, rerun) = send(
        &app,
        Method::POST,
        "/rewards/admin/auto-award-monthly",
        Some(&juan.token),
        None,
    )
    .await;
    assert_eq!(rerun["awarded"], json!([]));

    let (_, board) = send(&app, Method::GET, "/rewards/leaderboard", None, None).await;
    assert_eq!(board[0]["slaveId"], s2.id.as_str());
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[0]["totalCaptures"], 2);
    assert_eq!(board[0]["currentStreak"], 1);
    assert_eq!(board[0]["totalPoints"], 100);
    assert_eq!(board[1]["slaveId"], s1.id.as_str());
    assert_eq!(board[1]["totalPoints"], 50);

    let (_, mine) = send(&app, Method::GET, "/rewards/my-rewards", Some(&s1.token), None).await;
    let reward_id = mine[0]["id"].as_str().unwrap().to_string();

    let claim_uri = format!("/rewards/{reward_id}/claim");
    let (status, _) = send(&app, Method::PATCH, &claim_uri, Some(&s2.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, claimed) = send(&app, Method::PATCH, &claim_uri, Some(&s1.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claimed["status"], "claimed");

    let (_, stats) = send(&app, Method::GET, "/rewards/admin/stats", Some(&juan.token), None).await;
    assert_eq!(stats["totalRewards"], 2);
    assert_eq!(stats["byStatus"]["claimed"], 1);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sessions_and_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("war.redb");

    let token = {
        let state = AppState::new(Database::open(&path).unwrap(), TokenIssuer::new(b"k", 3600));
        let app = router(state);
        register(&app, "persistent", "developer").await.token
    };

    let state = AppState::new(Database::open(&path).unwrap(), TokenIssuer::new(b"k", 3600));
    let app = router(state);
    let (status, me) = send(&app, Method::GET, "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "persistent");
}
