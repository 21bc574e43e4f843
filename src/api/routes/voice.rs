use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json, Extension};
use serde::{Deserialize, Serialize};

use crate::api::dto::{api_error, internal_error, ApiError};
use crate::api::middleware::Claims;
use crate::api::AppState;
use crate::domain::services::{JoinOutcome, VoiceSessionError};
use crate::infrastructure::services::{VoiceEngineError, VoiceError, VoiceStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRequest {
    pub channel_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    pub muted: bool,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    pub level: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceResponse {
    pub success: bool,
    pub voice: VoiceStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceJoinResponse {
    pub success: bool,
    pub already_joined: bool,
    pub voice: VoiceStatus,
}

#[derive(Debug, Serialize)]
pub struct VoiceLeaveResponse {
    pub success: bool,
    pub left: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeResponse {
    pub success: bool,
    pub active_speaker: bool,
}

fn voice_error(e: VoiceError) -> ApiError {
    match e {
        VoiceError::Session(VoiceSessionError::BusyInOtherChannel(channel)) => api_error(
            StatusCode::CONFLICT,
            "VOICE_BUSY",
            format!("Already in voice channel {channel}"),
        ),
        VoiceError::Session(VoiceSessionError::NotInChannel) => api_error(
            StatusCode::CONFLICT,
            "NOT_IN_VOICE_CHANNEL",
            "Not in a voice channel",
        ),
        VoiceError::Engine(VoiceEngineError::InvalidChannel) => api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_CHANNEL",
            "Channel id must not be empty",
        ),
        e => internal_error("VOICE_ERROR", "Voice operation failed", e),
    }
}

/// GET /api/voice - Current voice session of the caller
pub async fn voice_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Json<VoiceResponse> {
    Json(VoiceResponse {
        success: true,
        voice: state.voice.status(&claims.user_id).await,
    })
}

/// POST /api/voice/join
pub async fn join_voice(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<ChannelRequest>,
) -> Result<Json<VoiceJoinResponse>, ApiError> {
    let (outcome, voice) = state
        .voice
        .join(&claims.user_id, &body.channel_id)
        .await
        .map_err(voice_error)?;

    Ok(Json(VoiceJoinResponse {
        success: true,
        already_joined: outcome == JoinOutcome::AlreadyJoined,
        voice,
    }))
}

/// POST /api/voice/leave
pub async fn leave_voice(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<ChannelRequest>,
) -> Result<Json<VoiceLeaveResponse>, ApiError> {
    let left = state
        .voice
        .leave(&claims.user_id, &body.channel_id)
        .await
        .map_err(voice_error)?;

    Ok(Json(VoiceLeaveResponse {
        success: true,
        left,
    }))
}

/// POST /api/voice/mute
pub async fn mute_voice(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<MuteRequest>,
) -> Result<Json<VoiceResponse>, ApiError> {
    let voice = state
        .voice
        .set_muted(&claims.user_id, body.muted)
        .await
        .map_err(voice_error)?;

    Ok(Json(VoiceResponse {
        success: true,
        voice,
    }))
}

/// POST /api/voice/volume
pub async fn report_volume(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<VolumeRequest>,
) -> Result<Json<VolumeResponse>, ApiError> {
    let active_speaker = state
        .voice
        .report_volume(&claims.user_id, body.level)
        .await
        .map_err(voice_error)?;

    Ok(Json(VolumeResponse {
        success: true,
        active_speaker,
    }))
}
