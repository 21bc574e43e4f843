use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_broadcast::RecvError;
use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;

use crate::api::dto::PartyDto;
use crate::application::party::{ListParties, ListPartiesInput};
use crate::infrastructure::app_state::AppState;
use crate::infrastructure::services::LobbyEvent;

const HEARTBEAT_PERIOD: Duration = Duration::from_secs(20);

#[derive(Deserialize)]
pub struct SseParams {
    token: Option<String>,
}

/// GET /api/events?token= - Every event visible to the token's user
pub async fn sse_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SseParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = params
        .token
        .and_then(|token| state.jwt_service.verify(&token).ok())
        .map(|claims| claims.user_id);

    let mut receiver = state.events.subscribe();

    let stream = async_stream::stream! {
        tracing::debug!(user_id = ?user_id, "SSE stream started");

        // Send initial connected event
        yield Ok(Event::default()
            .event("connected")
            .data(serde_json::json!({
                "message": "Connected to SSE stream",
                "authenticated": user_id.is_some(),
                "timestamp": chrono::Utc::now().timestamp_millis()
            }).to_string()));

        let mut heartbeat_interval = tokio::time::interval(HEARTBEAT_PERIOD);

        loop {
            tokio::select! {
                _ = heartbeat_interval.tick() => {
                    tracing::trace!("SSE heartbeat");
                    // Send heartbeat comment (not a real event)
                    yield Ok(Event::default().comment("heartbeat"));
                }
                result = receiver.recv() => {
                    match result {
                        Ok(event) => {
                            if !event.is_visible_to(user_id.as_deref()) {
                                continue;
                            }
                            match serde_json::to_string(&event) {
                                Ok(json) => yield Ok(Event::default().event("event").data(json)),
                                Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
                            }
                        }
                        Err(RecvError::Overflowed(skipped)) => {
                            tracing::debug!(skipped, "SSE subscriber lagged, skipping events");
                        }
                        Err(RecvError::Closed) => {
                            tracing::warn!("event channel closed, ending SSE stream");
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/lobbies/:gameId/parties/stream - Live party list for one game.
///
/// Sends a full snapshot on connect and again after every party update
/// for the game.
pub async fn lobby_stream_handler(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut receiver = state.events.subscribe();

    let stream = async_stream::stream! {
        tracing::debug!(game_id = %game_id, "lobby stream started");

        let mut refresh = true;
        let mut heartbeat_interval = tokio::time::interval(HEARTBEAT_PERIOD);

        loop {
            if refresh {
                refresh = false;
                match snapshot(&state, &game_id).await {
                    Ok(json) => yield Ok(Event::default().event("parties").data(json)),
                    Err(e) => tracing::warn!(game_id = %game_id, error = %e, "failed to build lobby snapshot"),
                }
            }

            tokio::select! {
                _ = heartbeat_interval.tick() => {
                    yield Ok(Event::default().comment("heartbeat"));
                }
                result = receiver.recv() => {
                    match result {
                        Ok(event) => refresh = refreshes_lobby(&event, &game_id),
                        // Missed updates may have touched this game
                        Err(RecvError::Overflowed(_)) => refresh = true,
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Whether `event` can change the party list of `game_id`
fn refreshes_lobby(event: &LobbyEvent, game_id: &str) -> bool {
    event.event_type == "partyUpdate" && event.game_id.as_deref() == Some(game_id)
}

/// Non-stale parties of the game, serialized as one `parties` event payload
async fn snapshot(state: &AppState, game_id: &str) -> anyhow::Result<String> {
    let output = ListParties::new(state.party_repo.clone())
        .execute(ListPartiesInput {
            game_id: game_id.to_string(),
            user_id: None,
            cutoff_millis: state.config.stale_cutoff_millis(),
            limit: state.config.party_list_limit,
        })
        .await?;

    let parties: Vec<PartyDto> = output
        .parties
        .into_iter()
        .map(|item| PartyDto::new(item.party, None))
        .collect();

    Ok(serde_json::to_string(&serde_json::json!({
        "gameId": game_id,
        "parties": parties,
        "timestamp": chrono::Utc::now().timestamp_millis(),
    }))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Party;
    use crate::domain::repositories::PartyRepository;
    use crate::domain::value_objects::{GameRef, TagSet};
    use crate::infrastructure::config::Config;

    async fn party(state: &AppState, id: &str, game_id: &str, age_millis: i64) {
        let game = GameRef {
            id: game_id.into(),
            name: game_id.into(),
            cover_url: None,
        };
        let mut party = Party::new(id.into(), game, TagSet::new(vec![]).unwrap(), "A".into());
        party.created_at -= age_millis;
        state.party_repo.create(&party).await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_lists_only_fresh_parties_of_the_game() {
        let state = AppState::from_config(Config::for_tests()).await.unwrap();
        let window = state.config.party_stale_after.as_millis() as i64;
        party(&state, "fresh", "apex", 0).await;
        party(&state, "expired", "apex", window + 60_000).await;
        party(&state, "other-game", "halo", 0).await;

        let json: serde_json::Value =
            serde_json::from_str(&snapshot(&state, "apex").await.unwrap()).unwrap();

        assert_eq!(json["gameId"], "apex");
        let ids: Vec<_> = json["parties"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["fresh"]);
    }

    #[test]
    fn only_party_updates_for_the_game_refresh() {
        let own = LobbyEvent::party_update("playerJoined", "apex", "p1", "A");
        let other = LobbyEvent::party_update("playerJoined", "halo", "p2", "B");
        let chat = LobbyEvent::new("chatMessage").with_game("apex");

        assert!(refreshes_lobby(&own, "apex"));
        assert!(!refreshes_lobby(&other, "apex"));
        assert!(!refreshes_lobby(&chat, "apex"));
    }
}
