use async_trait::async_trait;

use crate::domain::entities::{Party, PartyRuleViolation};
use crate::domain::repositories::RepositoryError;

/// Result of a committed leave transaction
#[derive(Debug, Clone)]
pub struct LeaveTransaction {
    /// Party as written by the transaction
    pub party: Party,
    /// The last user left; the caller must follow up with `delete_if_empty`
    pub scheduled_for_deletion: bool,
}

/// Party repository trait
#[async_trait]
pub trait PartyRepository: Send + Sync {
    /// Find party by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Party>, RepositoryError>;

    /// Find the oldest joinable party for a game with exactly these tag ids,
    /// created after `cutoff_millis`. Empty parties awaiting deletion never match.
    async fn find_open_party(
        &self,
        game_id: &str,
        tag_ids: &[String],
        cutoff_millis: i64,
    ) -> Result<Option<Party>, RepositoryError>;

    /// Non-stale parties for a game, oldest first
    async fn list_for_game(
        &self,
        game_id: &str,
        cutoff_millis: i64,
        limit: u32,
    ) -> Result<Vec<Party>, RepositoryError>;

    /// Insert a new party
    async fn create(&self, party: &Party) -> Result<(), RepositoryError>;

    /// Transactionally append a user to a party
    async fn join(&self, party_id: &str, user_id: &str) -> Result<Party, PartyTransactionError>;

    /// Transactionally remove a user from a party
    async fn leave(
        &self,
        party_id: &str,
        user_id: &str,
    ) -> Result<LeaveTransaction, PartyTransactionError>;

    /// Record that the party was handed off to a chatroom. Returns false when
    /// the party is gone or another handoff already claimed it.
    async fn mark_chatroom_created(
        &self,
        party_id: &str,
        chatroom_id: &str,
    ) -> Result<bool, RepositoryError>;

    /// Delete the party only while it has no members. Returns whether a row
    /// was removed; a user who joined after the leave keeps the party alive.
    async fn delete_if_empty(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// Failure of a join or leave transaction
#[derive(Debug, thiserror::Error)]
pub enum PartyTransactionError {
    #[error("Party not found")]
    NotFound,
    #[error("Already in party")]
    AlreadyJoined,
    #[error("Party is full")]
    Full,
    #[error("Party chatroom already created")]
    Closed,
    #[error("Not in party")]
    NotMember,
    #[error("Transaction aborted after repeated contention")]
    Contention,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PartyRuleViolation> for PartyTransactionError {
    fn from(violation: PartyRuleViolation) -> Self {
        match violation {
            PartyRuleViolation::AlreadyJoined => PartyTransactionError::AlreadyJoined,
            PartyRuleViolation::Full => PartyTransactionError::Full,
            PartyRuleViolation::Closed => PartyTransactionError::Closed,
            PartyRuleViolation::NotMember => PartyTransactionError::NotMember,
        }
    }
}
