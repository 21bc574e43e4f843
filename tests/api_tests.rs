//! API integration tests for the LFG backend.
//!
//! Drives the axum router in-process against an in-memory database.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::{Service, ServiceExt};

use lfg_backend::api;
use lfg_backend::infrastructure::app_state::AppState;
use lfg_backend::infrastructure::config::Config;

/// Helper to create a test application
async fn create_test_app() -> Router {
    create_test_app_with(Config::for_tests()).await
}

async fn create_test_app_with(config: Config) -> Router {
    let state = AppState::from_config(config)
        .await
        .expect("Failed to create app state");
    let state = Arc::new(state);

    Router::new()
        .nest("/api", api::routes::create_api_router(state.clone()))
        .with_state(state)
}

async fn send(app: &mut Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = ServiceExt::<Request<Body>>::ready(app)
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Helper to make a POST request with JSON body
async fn post_json(app: &mut Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Helper to make a POST request with auth header
async fn post_json_auth(
    app: &mut Router,
    path: &str,
    body: Value,
    token: &str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Helper to make a GET request, optionally authenticated
async fn get(app: &mut Router, path: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

/// Register a user and return (user id, token)
async fn register(app: &mut Router, username: &str) -> (String, String) {
    let (status, body) = post_json(
        app,
        "/api/auth/register",
        json!({ "username": username, "password": "password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

fn duo_tags() -> Value {
    json!({
        "gameName": "Rocket League",
        "tags": [
            { "id": "ranked", "name": "Ranked", "category": "mode", "priority": 1 },
            { "id": "duo", "name": "Duo", "category": "size", "priority": 0, "size": 2 }
        ]
    })
}

/// Next `parties` payload on a lobby stream, if one arrives within `wait`
async fn next_lobby_snapshot(body: &mut Body, wait: Duration) -> Option<Value> {
    tokio::time::timeout(wait, async {
        while let Some(frame) = body.frame().await {
            let Ok(data) = frame.ok()?.into_data() else {
                continue;
            };
            let text = String::from_utf8_lossy(&data).into_owned();
            if text.lines().any(|line| line == "event: parties") {
                let payload = text.lines().find_map(|line| line.strip_prefix("data: "))?;
                return serde_json::from_str(payload).ok();
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

// ========== Auth ==========

#[tokio::test]
async fn test_register_missing_credentials() {
    let mut app = create_test_app().await;

    let (status, body) = post_json(&mut app, "/api/auth/register", json!({ "username": "solo" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_CREDENTIALS");
}

#[tokio::test]
async fn test_register_and_login() {
    let mut app = create_test_app().await;
    let (user_id, _) = register(&mut app, "tracer").await;

    let (status, body) = post_json(
        &mut app,
        "/api/auth/login",
        json!({ "username": "tracer", "password": "password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert!(body["token"].as_str().is_some());

    let (status, body) = post_json(
        &mut app,
        "/api/auth/login",
        json!({ "username": "tracer", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    let (status, body) = post_json(
        &mut app,
        "/api/auth/register",
        json!({ "username": "tracer", "password": "password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "USERNAME_EXISTS");
}

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let mut app = create_test_app().await;

    let (status, _) = post_json(&mut app, "/api/lobbies/rocket-league/match", duo_tags()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&mut app, "/api/chatrooms", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&mut app, "/api/voice", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Lobby listing is public
    let (status, body) = get(&mut app, "/api/lobbies/rocket-league/parties", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["parties"], json!([]));
}

#[tokio::test]
async fn test_health() {
    let mut app = create_test_app().await;

    let (status, body) = get(&mut app, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

// ========== Matchmaking ==========

#[tokio::test]
async fn test_duo_fills_then_next_user_starts_new_party() {
    let mut app = create_test_app().await;
    let (a_id, a_token) = register(&mut app, "alpha").await;
    let (b_id, b_token) = register(&mut app, "bravo").await;
    let (_, c_token) = register(&mut app, "charlie").await;

    let (status, a) =
        post_json_auth(&mut app, "/api/lobbies/rocket-league/match", duo_tags(), &a_token).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(a["created"], true);
    assert_eq!(a["party"]["maxSize"], 2);
    assert_eq!(a["party"]["tagIds"], json!(["duo", "ranked"]));
    let party_id = a["party"]["id"].as_str().unwrap().to_string();

    let (status, listing) =
        get(&mut app, "/api/lobbies/rocket-league/parties", Some(&b_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["parties"].as_array().unwrap().len(), 1);
    assert_eq!(listing["parties"][0]["isMember"], false);

    let (status, b) =
        post_json_auth(&mut app, "/api/lobbies/rocket-league/match", duo_tags(), &b_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(b["created"], false);
    assert_eq!(b["party"]["id"], party_id.as_str());
    assert_eq!(b["party"]["users"], json!([a_id, b_id]));
    assert_eq!(b["party"]["chatroomCreated"], true);
    assert_eq!(b["handoffPending"], false);
    let chatroom_id = b["chatroomId"].as_str().unwrap().to_string();

    // Late observers are redirected to the chatroom
    let (status, details) = get(&mut app, &format!("/api/party/{party_id}"), Some(&a_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["party"]["chatroomId"], chatroom_id.as_str());
    assert_eq!(details["members"][1]["username"], "bravo");

    let (status, c) =
        post_json_auth(&mut app, "/api/lobbies/rocket-league/match", duo_tags(), &c_token).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(c["created"], true);
    assert_ne!(c["party"]["id"], party_id.as_str());

    // Filled parties are no longer listed
    let (_, listing) = get(&mut app, "/api/lobbies/rocket-league/parties", None).await;
    let parties = listing["parties"].as_array().unwrap();
    assert_eq!(parties.len(), 1);
    assert_eq!(parties[0]["id"], c["party"]["id"]);
}

#[tokio::test]
async fn test_join_rules_and_leave_deletes_empty_party() {
    let mut app = create_test_app().await;
    let (_, a_token) = register(&mut app, "alpha").await;
    let (_, b_token) = register(&mut app, "bravo").await;

    let (_, a) =
        post_json_auth(&mut app, "/api/lobbies/valorant/match", json!({ "tags": [] }), &a_token)
            .await;
    let party_id = a["party"]["id"].as_str().unwrap().to_string();
    assert_eq!(a["party"]["maxSize"], 4);

    let (status, body) =
        post_json_auth(&mut app, &format!("/api/party/{party_id}/join"), json!({}), &a_token).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_IN_PARTY");

    let (status, body) =
        post_json_auth(&mut app, &format!("/api/party/{party_id}/join"), json!({}), &b_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["party"]["userCount"], 2);
    assert!(body.get("chatroomId").is_none());

    let (status, body) =
        post_json_auth(&mut app, &format!("/api/party/{party_id}/leave"), json!({}), &a_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["partyDeleted"], false);

    let (status, body) =
        post_json_auth(&mut app, &format!("/api/party/{party_id}/leave"), json!({}), &a_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NOT_IN_PARTY");

    let (status, body) =
        post_json_auth(&mut app, &format!("/api/party/{party_id}/leave"), json!({}), &b_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["partyDeleted"], true);
    assert_eq!(body["remainingUsers"], json!([]));

    let (status, body) = get(&mut app, &format!("/api/party/{party_id}"), Some(&b_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PARTY_NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_tags_are_rejected() {
    let mut app = create_test_app().await;
    let (_, token) = register(&mut app, "alpha").await;

    let (status, body) = post_json_auth(
        &mut app,
        "/api/lobbies/valorant/match",
        json!({ "tags": [
            { "id": "duo", "name": "Duo", "category": "size", "size": 2 },
            { "id": "trio", "name": "Trio", "category": "size", "size": 3 }
        ] }),
        &token,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TAGS");
}

#[tokio::test]
async fn test_stale_parties_are_hidden_and_unjoinable() {
    let config = Config {
        party_stale_after: Duration::ZERO,
        ..Config::for_tests()
    };
    let mut app = create_test_app_with(config).await;
    let (_, a_token) = register(&mut app, "alpha").await;
    let (_, b_token) = register(&mut app, "bravo").await;

    let (_, a) =
        post_json_auth(&mut app, "/api/lobbies/rocket-league/match", duo_tags(), &a_token).await;
    let stale_id = a["party"]["id"].as_str().unwrap().to_string();

    let (_, listing) = get(&mut app, "/api/lobbies/rocket-league/parties", None).await;
    assert_eq!(listing["parties"], json!([]));

    let (status, details) = get(&mut app, &format!("/api/party/{stale_id}"), Some(&b_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["isStale"], true);

    let (status, body) =
        post_json_auth(&mut app, &format!("/api/party/{stale_id}/join"), json!({}), &b_token).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["code"], "PARTY_EXPIRED");

    // Matching ignores the stale party and starts a new one
    let (status, b) =
        post_json_auth(&mut app, "/api/lobbies/rocket-league/match", duo_tags(), &b_token).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(b["party"]["id"], stale_id.as_str());
}

// ========== Lobby stream ==========

#[tokio::test]
async fn test_lobby_stream_refreshes_only_for_its_game() {
    let mut app = create_test_app().await;
    let (_, a_token) = register(&mut app, "alpha").await;
    let (_, b_token) = register(&mut app, "bravo").await;

    let request = Request::builder()
        .uri("/api/lobbies/rocket-league/parties/stream")
        .body(Body::empty())
        .unwrap();
    let response = ServiceExt::<Request<Body>>::ready(&mut app)
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut stream = response.into_body();

    let initial = next_lobby_snapshot(&mut stream, Duration::from_secs(1))
        .await
        .expect("snapshot on connect");
    assert_eq!(initial["gameId"], "rocket-league");
    assert_eq!(initial["parties"], json!([]));

    // Another game's update leaves this lobby alone
    let (status, _) =
        post_json_auth(&mut app, "/api/lobbies/halo/match", duo_tags(), &a_token).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(next_lobby_snapshot(&mut stream, Duration::from_millis(300))
        .await
        .is_none());

    let (status, created) =
        post_json_auth(&mut app, "/api/lobbies/rocket-league/match", duo_tags(), &b_token).await;
    assert_eq!(status, StatusCode::CREATED);
    let refreshed = next_lobby_snapshot(&mut stream, Duration::from_secs(1))
        .await
        .expect("refresh after own game update");
    let parties = refreshed["parties"].as_array().unwrap();
    assert_eq!(parties.len(), 1);
    assert_eq!(parties[0]["id"], created["party"]["id"]);
}

// ========== Chat ==========

#[tokio::test]
async fn test_chatroom_is_members_only() {
    let mut app = create_test_app().await;
    let (_, a_token) = register(&mut app, "alpha").await;
    let (_, b_token) = register(&mut app, "bravo").await;
    let (_, c_token) = register(&mut app, "charlie").await;

    post_json_auth(&mut app, "/api/lobbies/rocket-league/match", duo_tags(), &a_token).await;
    let (_, b) =
        post_json_auth(&mut app, "/api/lobbies/rocket-league/match", duo_tags(), &b_token).await;
    let chatroom_id = b["chatroomId"].as_str().unwrap().to_string();
    let messages_path = format!("/api/chatrooms/{chatroom_id}/messages");

    let (status, rooms) = get(&mut app, "/api/chatrooms", Some(&a_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rooms["chatrooms"][0]["id"], chatroom_id.as_str());

    let (status, posted) =
        post_json_auth(&mut app, &messages_path, json!({ "body": " gl hf " }), &a_token).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(posted["message"]["body"], "gl hf");

    let (status, history) = get(&mut app, &messages_path, Some(&b_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["messages"].as_array().unwrap().len(), 1);

    let (status, body) = get(&mut app, &messages_path, Some(&c_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NOT_IN_CHATROOM");

    let (status, body) =
        post_json_auth(&mut app, &messages_path, json!({ "body": "   " }), &b_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

// ========== Voice ==========

#[tokio::test]
async fn test_voice_single_channel_lifecycle() {
    let mut app = create_test_app().await;
    let (a_id, a_token) = register(&mut app, "alpha").await;
    let (b_id, b_token) = register(&mut app, "bravo").await;

    let (status, body) = post_json_auth(
        &mut app,
        "/api/voice/join",
        json!({ "channelId": "room-1" }),
        &a_token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadyJoined"], false);
    assert_eq!(body["voice"]["channelId"], "room-1");

    let (_, body) = post_json_auth(
        &mut app,
        "/api/voice/join",
        json!({ "channelId": "room-1" }),
        &a_token,
    )
    .await;
    assert_eq!(body["alreadyJoined"], true);

    let (status, body) = post_json_auth(
        &mut app,
        "/api/voice/join",
        json!({ "channelId": "room-2" }),
        &a_token,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "VOICE_BUSY");

    let (_, body) = post_json_auth(
        &mut app,
        "/api/voice/join",
        json!({ "channelId": "room-1" }),
        &b_token,
    )
    .await;
    assert_eq!(body["voice"]["remoteUsers"], json!([a_id]));

    let (_, body) = get(&mut app, "/api/voice", Some(&a_token)).await;
    assert_eq!(body["voice"]["remoteUsers"], json!([b_id]));

    let (status, body) =
        post_json_auth(&mut app, "/api/voice/mute", json!({ "muted": true }), &a_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["voice"]["muted"], true);

    // Leaving another channel is a no-op
    let (_, body) = post_json_auth(
        &mut app,
        "/api/voice/leave",
        json!({ "channelId": "room-2" }),
        &a_token,
    )
    .await;
    assert_eq!(body["left"], false);

    let (_, body) = post_json_auth(
        &mut app,
        "/api/voice/leave",
        json!({ "channelId": "room-1" }),
        &a_token,
    )
    .await;
    assert_eq!(body["left"], true);

    let (_, body) = get(&mut app, "/api/voice", Some(&b_token)).await;
    assert_eq!(body["voice"]["remoteUsers"], json!([]));

    let (status, body) =
        post_json_auth(&mut app, "/api/voice/mute", json!({ "muted": false }), &a_token).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_IN_VOICE_CHANNEL");
}
