use serde::{Deserialize, Serialize};

/// Game a party is formed for, embedded in party and chatroom records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl GameRef {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.id.trim().is_empty() {
            return Err("Game id is required");
        }
        if self.name.trim().is_empty() {
            return Err("Game name is required");
        }
        Ok(())
    }
}
