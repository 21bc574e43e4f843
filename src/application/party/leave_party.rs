use std::sync::Arc;

use crate::domain::entities::Party;
use crate::domain::repositories::{PartyRepository, PartyTransactionError, RepositoryError};

/// Leave party input
pub struct LeavePartyInput {
    pub user_id: String,
    pub party_id: String,
}

/// Leave party output
pub struct LeavePartyOutput {
    /// Party as left behind by the transaction
    pub party: Party,
    pub party_deleted: bool,
}

/// Leave party use case
pub struct LeaveParty<P: PartyRepository> {
    party_repo: Arc<P>,
}

impl<P: PartyRepository> LeaveParty<P> {
    pub fn new(party_repo: Arc<P>) -> Self {
        Self { party_repo }
    }

    pub async fn execute(
        &self,
        input: LeavePartyInput,
    ) -> Result<LeavePartyOutput, LeavePartyError> {
        let outcome = self
            .party_repo
            .leave(&input.party_id, &input.user_id)
            .await?;

        tracing::info!(
            party_id = %input.party_id,
            user_id = %input.user_id,
            remaining = outcome.party.users.len(),
            "left party"
        );

        // Deletion runs after the commit and only removes a still-empty
        // party. A user who joined in between keeps it; an empty party left
        // behind by a failure is hidden from matching and listing.
        let mut party_deleted = false;
        if outcome.scheduled_for_deletion {
            party_deleted = match self.party_repo.delete_if_empty(&input.party_id).await {
                Ok(deleted) => deleted,
                Err(e) => {
                    tracing::error!(party_id = %input.party_id, error = %e, "failed to delete empty party");
                    return Err(e.into());
                }
            };
            if party_deleted {
                tracing::info!(party_id = %input.party_id, "deleted empty party");
            } else {
                tracing::info!(party_id = %input.party_id, "party refilled before deletion");
            }
        }

        Ok(LeavePartyOutput {
            party: outcome.party,
            party_deleted,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LeavePartyError {
    #[error("Party not found")]
    PartyNotFound,
    #[error("Not in party")]
    NotInParty,
    #[error("Party is busy, try again")]
    Contention,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PartyTransactionError> for LeavePartyError {
    fn from(err: PartyTransactionError) -> Self {
        match err {
            PartyTransactionError::NotFound => LeavePartyError::PartyNotFound,
            PartyTransactionError::NotMember => LeavePartyError::NotInParty,
            PartyTransactionError::Contention => LeavePartyError::Contention,
            PartyTransactionError::Repository(e) => LeavePartyError::Repository(e),
            // Leave never adds a member
            PartyTransactionError::AlreadyJoined
            | PartyTransactionError::Full
            | PartyTransactionError::Closed => LeavePartyError::NotInParty,
        }
    }
}
