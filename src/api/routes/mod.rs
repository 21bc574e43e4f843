pub mod auth;
pub mod chatroom;
pub mod health;
pub mod lobby;
pub mod party;
pub mod voice;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::api::middleware::{auth_middleware, optional_auth_middleware};
use crate::api::sse;
use crate::api::AppState;

/// Create the main API router
pub fn create_api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/auth", auth::create_auth_router())
        .nest("/lobbies", create_lobby_router(state.clone()))
        .nest("/party", create_party_router(state.clone()))
        .nest("/chatrooms", create_chatroom_router(state.clone()))
        .nest("/voice", create_voice_router(state.clone()))
        .route("/events", get(sse::sse_handler))
        .route("/health", get(health::health_handler))
        .with_state(state)
}

/// Create lobby router
fn create_lobby_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Public routes (optional auth)
        .route(
            "/:gameId/parties",
            get(lobby::list_parties).layer(middleware::from_fn_with_state(
                state.clone(),
                optional_auth_middleware,
            )),
        )
        .route("/:gameId/parties/stream", get(sse::lobby_stream_handler))
        // Protected routes (require auth)
        .route(
            "/:gameId/match",
            post(lobby::match_party).layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state)
}

/// Create party router
fn create_party_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/:partyId", get(party::get_party))
        .route("/:partyId/join", post(party::join_party))
        .route("/:partyId/leave", post(party::leave_party))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// Create chatroom router
fn create_chatroom_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(chatroom::list_my_chatrooms))
        .route("/:chatroomId", get(chatroom::get_chatroom))
        .route(
            "/:chatroomId/messages",
            get(chatroom::list_messages).post(chatroom::post_message),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// Create voice router
fn create_voice_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(voice::voice_status))
        .route("/join", post(voice::join_voice))
        .route("/leave", post(voice::leave_voice))
        .route("/mute", post(voice::mute_voice))
        .route("/volume", post(voice::report_volume))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
