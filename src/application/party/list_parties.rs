use std::sync::Arc;

use crate::domain::entities::Party;
use crate::domain::repositories::{PartyRepository, RepositoryError};

/// Upper bound on a single lobby page
pub const MAX_PARTY_LIST_LIMIT: u32 = 100;

/// List parties input
pub struct ListPartiesInput {
    pub game_id: String,
    pub user_id: Option<String>,
    pub cutoff_millis: i64,
    pub limit: u32,
}

/// Party list item
pub struct PartyListItem {
    pub party: Party,
    pub is_member: bool,
}

/// List parties output
pub struct ListPartiesOutput {
    pub game_id: String,
    pub parties: Vec<PartyListItem>,
}

/// Live lobby listing for one game, oldest first
pub struct ListParties<P: PartyRepository> {
    party_repo: Arc<P>,
}

impl<P: PartyRepository> ListParties<P> {
    pub fn new(party_repo: Arc<P>) -> Self {
        Self { party_repo }
    }

    pub async fn execute(
        &self,
        input: ListPartiesInput,
    ) -> Result<ListPartiesOutput, ListPartiesError> {
        let limit = input.limit.clamp(1, MAX_PARTY_LIST_LIMIT);

        let parties = self
            .party_repo
            .list_for_game(&input.game_id, input.cutoff_millis, limit)
            .await?;

        let parties = parties
            .into_iter()
            .map(|party| {
                let is_member = input
                    .user_id
                    .as_deref()
                    .map(|uid| party.is_member(uid))
                    .unwrap_or(false);
                PartyListItem { party, is_member }
            })
            .collect();

        Ok(ListPartiesOutput {
            game_id: input.game_id,
            parties,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListPartiesError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
