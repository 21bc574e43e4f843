use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::{Deserialize, Serialize};

use crate::api::dto::{api_error, internal_error, ApiError, ErrorResponse, PartyDto};
use crate::api::middleware::Claims;
use crate::api::routes::party::announce_join;
use crate::api::AppState;
use crate::application::party::{
    JoinOrCreateParty, JoinOrCreatePartyError, JoinOrCreatePartyInput, ListParties,
    ListPartiesInput,
};
use crate::domain::value_objects::{GameRef, Tag};
use crate::infrastructure::services::LobbyEvent;

#[derive(Debug, Deserialize)]
pub struct ListPartiesQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    /// Display name of the game; defaults to the id
    pub game_name: Option<String>,
    pub cover_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPartiesResponse {
    pub success: bool,
    pub game_id: String,
    pub parties: Vec<PartyDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub success: bool,
    pub created: bool,
    pub party: PartyDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chatroom_id: Option<String>,
    pub handoff_pending: bool,
}

/// GET /api/lobbies/:gameId/parties - Fresh parties for a game, oldest first
pub async fn list_parties(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<Claims>>,
    Path(game_id): Path<String>,
    Query(query): Query<ListPartiesQuery>,
) -> Result<Json<ListPartiesResponse>, ApiError> {
    let user_id = claims.map(|Extension(c)| c.user_id);
    let result = ListParties::new(state.party_repo.clone())
        .execute(ListPartiesInput {
            game_id,
            user_id,
            cutoff_millis: state.config.stale_cutoff_millis(),
            limit: query.limit.unwrap_or(state.config.party_list_limit),
        })
        .await
        .map_err(|e| internal_error("GET_PARTIES_ERROR", "Failed to get parties", e))?;

    Ok(Json(ListPartiesResponse {
        success: true,
        game_id: result.game_id,
        parties: result
            .parties
            .into_iter()
            .map(|item| PartyDto {
                user_count: item.party.users.len(),
                is_member: item.is_member,
                party: item.party,
            })
            .collect(),
    }))
}

/// POST /api/lobbies/:gameId/match - Join the oldest matching party or start one
pub async fn match_party(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(game_id): Path<String>,
    Json(body): Json<MatchRequest>,
) -> Result<(StatusCode, Json<MatchResponse>), ApiError> {
    let game = GameRef {
        name: body.game_name.unwrap_or_else(|| game_id.clone()),
        id: game_id,
        cover_url: body.cover_url,
    };

    let use_case = JoinOrCreateParty::new(state.party_repo.clone(), state.chatroom_repo.clone());
    let result = use_case
        .execute(JoinOrCreatePartyInput {
            user_id: claims.user_id.clone(),
            game,
            tags: body.tags,
            cutoff_millis: state.config.stale_cutoff_millis(),
        })
        .await
        .map_err(|e| match e {
            JoinOrCreatePartyError::Validation(msg) => {
                api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
            }
            JoinOrCreatePartyError::InvalidTags(e) => {
                api_error(StatusCode::BAD_REQUEST, "INVALID_TAGS", e.to_string())
            }
            JoinOrCreatePartyError::AlreadyInParty(party_id) => (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "Already in a matching party".to_string(),
                    code: "ALREADY_IN_PARTY".to_string(),
                    details: Some(party_id),
                }),
            ),
            JoinOrCreatePartyError::NoJoinableParty | JoinOrCreatePartyError::Contention => {
                api_error(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "MATCH_BUSY",
                    "Matchmaking is busy, try again",
                )
            }
            JoinOrCreatePartyError::Repository(e) => {
                internal_error("MATCH_ERROR", "Failed to match party", e)
            }
        })?;

    if result.created {
        let party = &result.party;
        state.broadcast_event(
            LobbyEvent::party_update("partyCreated", &party.game.id, &party.id, &claims.user_id)
                .with_data(serde_json::json!({
                    "username": claims.username,
                    "maxSize": party.max_size,
                    "tagIds": party.tag_ids,
                })),
        );
    } else {
        announce_join(&state, &result.party, result.chatroom.as_ref(), &claims);
    }

    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(MatchResponse {
            success: true,
            created: result.created,
            chatroom_id: result.chatroom.map(|c| c.id),
            handoff_pending: result.handoff_pending,
            party: PartyDto::new(result.party, Some(&claims.user_id)),
        }),
    ))
}
