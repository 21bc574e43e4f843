use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{GameRef, Tag, TagSet};

/// Party entity: a group of users waiting to fill before a chatroom is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: String,
    pub game: GameRef,
    /// Tags in priority order
    pub tags: Vec<Tag>,
    /// Exact-match key, same order as `tags`
    pub tag_ids: Vec<String>,
    pub max_size: u32,
    pub created_by: String,
    /// Server timestamp in milliseconds
    pub created_at: i64,
    /// Member ids in join order
    pub users: Vec<String>,
    pub chatroom_created: bool,
    pub chatroom_id: Option<String>,
}

impl Party {
    /// Create a new party seeded with its creator
    pub fn new(id: String, game: GameRef, tag_set: TagSet, created_by: String) -> Self {
        let tag_ids = tag_set.tag_ids();
        let max_size = tag_set.max_size();
        Self {
            id,
            game,
            tags: tag_set.into_tags(),
            tag_ids,
            max_size,
            users: vec![created_by.clone()],
            created_by,
            created_at: chrono::Utc::now().timestamp_millis(),
            chatroom_created: false,
            chatroom_id: None,
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.users.len() as u32 >= self.max_size
    }

    /// A party created at or before `cutoff_millis` is ignored by readers
    pub fn is_stale(&self, cutoff_millis: i64) -> bool {
        self.created_at <= cutoff_millis
    }

    /// Append a user, enforcing the idempotent-join and capacity rules
    pub fn add_user(&mut self, user_id: &str) -> Result<(), PartyRuleViolation> {
        if self.is_member(user_id) {
            return Err(PartyRuleViolation::AlreadyJoined);
        }
        if self.chatroom_created {
            return Err(PartyRuleViolation::Closed);
        }
        if self.is_full() {
            return Err(PartyRuleViolation::Full);
        }
        self.users.push(user_id.to_string());
        Ok(())
    }

    /// Remove a user. Returns true when nobody is left.
    pub fn remove_user(&mut self, user_id: &str) -> Result<bool, PartyRuleViolation> {
        let position = self
            .users
            .iter()
            .position(|u| u == user_id)
            .ok_or(PartyRuleViolation::NotMember)?;
        self.users.remove(position);
        Ok(self.users.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PartyRuleViolation {
    #[error("Already in party")]
    AlreadyJoined,
    #[error("Party is full")]
    Full,
    #[error("Party chatroom already created")]
    Closed,
    #[error("Not in party")]
    NotMember,
}
