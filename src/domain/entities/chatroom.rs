use serde::{Deserialize, Serialize};

use crate::domain::entities::Party;
use crate::domain::value_objects::{GameRef, Tag};

/// Longest accepted message body, in characters
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Persistent chat destination created once a party fills
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chatroom {
    pub id: String,
    pub party_id: String,
    pub game: GameRef,
    pub tags: Vec<Tag>,
    pub member_ids: Vec<String>,
    pub created_at: i64,
}

impl Chatroom {
    /// Snapshot a filled party into a chatroom
    pub fn from_party(id: String, party: &Party) -> Self {
        Self {
            id,
            party_id: party.id.clone(),
            game: party.game.clone(),
            tags: party.tags.clone(),
            member_ids: party.users.clone(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|m| m == user_id)
    }
}

/// Chat message entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub chatroom_id: String,
    pub sender_id: String,
    pub body: String,
    pub created_at: i64,
}

impl ChatMessage {
    pub fn new(id: String, chatroom_id: String, sender_id: String, body: String) -> Self {
        Self {
            id,
            chatroom_id,
            sender_id,
            body,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Trim a message body and check its length
pub fn normalize_message_body(body: &str) -> Result<String, &'static str> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err("Message must not be empty");
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err("Message is too long");
    }
    Ok(trimmed.to_string())
}
