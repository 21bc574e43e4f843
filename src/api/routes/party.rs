use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Serialize;

use crate::api::dto::{api_error, internal_error, ApiError, PartyDto};
use crate::api::middleware::Claims;
use crate::api::AppState;
use crate::application::party::{
    GetParty, GetPartyError, GetPartyInput, JoinParty, JoinPartyError, JoinPartyInput, LeaveParty,
    LeavePartyError, LeavePartyInput,
};
use crate::domain::entities::{Chatroom, Party};
use crate::infrastructure::services::LobbyEvent;

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyMemberDto {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyDetailsResponse {
    pub success: bool,
    pub party: PartyDto,
    pub members: Vec<PartyMemberDto>,
    pub is_stale: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPartyResponse {
    pub success: bool,
    pub party: PartyDto,
    /// Set when this join filled the party; clients move to the chatroom
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chatroom_id: Option<String>,
    /// The party filled but its chatroom is not created yet; re-read the party
    pub handoff_pending: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeavePartyResponse {
    pub success: bool,
    pub message: String,
    pub party_deleted: bool,
    pub remaining_users: Vec<String>,
}

// ============================================================================
// Events
// ============================================================================

/// Broadcast the outcome of a successful join, plus the fill when it happened
pub(crate) fn announce_join(
    state: &AppState,
    party: &Party,
    chatroom: Option<&Chatroom>,
    claims: &Claims,
) {
    state.broadcast_event(
        LobbyEvent::party_update("playerJoined", &party.game.id, &party.id, &claims.user_id)
            .with_data(serde_json::json!({
                "username": claims.username,
                "userCount": party.users.len(),
                "maxSize": party.max_size,
            })),
    );

    if let Some(chatroom) = chatroom {
        state.broadcast_event(
            LobbyEvent::party_update("partyFilled", &party.game.id, &party.id, &claims.user_id)
                .with_data(serde_json::json!({ "chatroomId": chatroom.id })),
        );
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/party/:partyId - Get party with its members
pub async fn get_party(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(party_id): Path<String>,
) -> Result<Json<PartyDetailsResponse>, ApiError> {
    let use_case = GetParty::new(
        state.user_repo.clone(),
        state.party_repo.clone(),
        state.chatroom_repo.clone(),
    );
    let result = use_case
        .execute(GetPartyInput {
            party_id,
            user_id: claims.user_id.clone(),
            cutoff_millis: state.config.stale_cutoff_millis(),
        })
        .await
        .map_err(|e| match e {
            GetPartyError::PartyNotFound => {
                api_error(StatusCode::NOT_FOUND, "PARTY_NOT_FOUND", "Party not found")
            }
            GetPartyError::Repository(e) => internal_error("GET_PARTY_ERROR", "Failed to get party", e),
        })?;

    if let Some(chatroom) = &result.resumed_chatroom {
        let party = &result.party;
        state.broadcast_event(
            LobbyEvent::party_update("partyFilled", &party.game.id, &party.id, &claims.user_id)
                .with_data(serde_json::json!({ "chatroomId": chatroom.id })),
        );
    }

    Ok(Json(PartyDetailsResponse {
        success: true,
        members: result
            .members
            .into_iter()
            .map(|m| PartyMemberDto {
                user_id: m.user_id,
                username: m.username,
            })
            .collect(),
        is_stale: result.is_stale,
        party: PartyDto::new(result.party, Some(&claims.user_id)),
    }))
}

/// POST /api/party/:partyId/join - Join a party picked from the lobby
pub async fn join_party(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(party_id): Path<String>,
) -> Result<Json<JoinPartyResponse>, ApiError> {
    let use_case = JoinParty::new(state.party_repo.clone(), state.chatroom_repo.clone());
    let result = use_case
        .execute(JoinPartyInput {
            user_id: claims.user_id.clone(),
            party_id,
            cutoff_millis: state.config.stale_cutoff_millis(),
        })
        .await
        .map_err(|e| match e {
            JoinPartyError::PartyNotFound => {
                api_error(StatusCode::NOT_FOUND, "PARTY_NOT_FOUND", "Party not found")
            }
            JoinPartyError::PartyStale => {
                api_error(StatusCode::GONE, "PARTY_EXPIRED", "Party has expired")
            }
            JoinPartyError::AlreadyInParty => {
                api_error(StatusCode::CONFLICT, "ALREADY_IN_PARTY", "Already in party")
            }
            JoinPartyError::PartyFull => {
                api_error(StatusCode::CONFLICT, "PARTY_FULL", "Party is full")
            }
            JoinPartyError::PartyClosed => api_error(
                StatusCode::CONFLICT,
                "PARTY_CLOSED",
                "Party already moved to a chatroom",
            ),
            JoinPartyError::Contention => api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "PARTY_BUSY",
                "Party is busy, try again",
            ),
            JoinPartyError::Repository(e) => {
                internal_error("JOIN_PARTY_ERROR", "Failed to join party", e)
            }
        })?;

    announce_join(&state, &result.party, result.chatroom.as_ref(), &claims);

    Ok(Json(JoinPartyResponse {
        success: true,
        chatroom_id: result.chatroom.map(|c| c.id),
        handoff_pending: result.handoff_pending,
        party: PartyDto::new(result.party, Some(&claims.user_id)),
    }))
}

/// POST /api/party/:partyId/leave - Leave a party
pub async fn leave_party(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(party_id): Path<String>,
) -> Result<Json<LeavePartyResponse>, ApiError> {
    let use_case = LeaveParty::new(state.party_repo.clone());
    let result = use_case
        .execute(LeavePartyInput {
            user_id: claims.user_id.clone(),
            party_id,
        })
        .await
        .map_err(|e| match e {
            LeavePartyError::PartyNotFound => {
                api_error(StatusCode::NOT_FOUND, "PARTY_NOT_FOUND", "Party not found")
            }
            LeavePartyError::NotInParty => {
                api_error(StatusCode::FORBIDDEN, "NOT_IN_PARTY", "Not in party")
            }
            LeavePartyError::Contention => api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "PARTY_BUSY",
                "Party is busy, try again",
            ),
            LeavePartyError::Repository(e) => {
                internal_error("LEAVE_PARTY_ERROR", "Failed to leave party", e)
            }
        })?;

    let party = &result.party;
    state.broadcast_event(
        LobbyEvent::party_update("playerLeft", &party.game.id, &party.id, &claims.user_id)
            .with_data(serde_json::json!({
                "username": claims.username,
                "userCount": party.users.len(),
            })),
    );
    if result.party_deleted {
        state.broadcast_event(LobbyEvent::party_update(
            "partyDeleted",
            &party.game.id,
            &party.id,
            &claims.user_id,
        ));
    }

    Ok(Json(LeavePartyResponse {
        success: true,
        message: if result.party_deleted {
            "Left party, party deleted".to_string()
        } else {
            "Left party successfully".to_string()
        },
        party_deleted: result.party_deleted,
        remaining_users: result.party.users,
    }))
}
