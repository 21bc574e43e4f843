use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::domain::entities::Party;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.to_string(),
            details: None,
        }),
    )
}

/// Log an unexpected failure and hide it behind a generic message
pub fn internal_error(code: &str, message: &str, err: impl std::fmt::Display) -> ApiError {
    tracing::error!(code, error = %err, "{}", message);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, code, message)
}

/// Party as returned by lobby and party routes
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyDto {
    #[serde(flatten)]
    pub party: Party,
    pub user_count: usize,
    pub is_member: bool,
}

impl PartyDto {
    pub fn new(party: Party, user_id: Option<&str>) -> Self {
        let is_member = user_id.map(|u| party.is_member(u)).unwrap_or(false);
        Self {
            user_count: party.users.len(),
            is_member,
            party,
        }
    }
}
