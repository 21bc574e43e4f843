use std::sync::Arc;

use crate::application::party::CompleteParty;
use crate::domain::entities::{Chatroom, Party};
use crate::domain::repositories::{
    ChatroomRepository, PartyRepository, RepositoryError, UserRepository,
};

/// Get party input
pub struct GetPartyInput {
    pub party_id: String,
    pub user_id: String,
    pub cutoff_millis: i64,
}

/// Party member with display name
pub struct PartyMember {
    pub user_id: String,
    pub username: Option<String>,
}

/// Get party output
pub struct GetPartyOutput {
    pub party: Party,
    /// Members in join order
    pub members: Vec<PartyMember>,
    pub is_member: bool,
    pub is_stale: bool,
    /// Chatroom created by this read for a previously pending handoff
    pub resumed_chatroom: Option<Chatroom>,
}

/// Read a party by id. Stale parties are still returned, flagged, so a
/// late observer can tell why it vanished from the lobby. A full party
/// whose handoff failed earlier is handed off here.
pub struct GetParty<U: UserRepository, P: PartyRepository, C: ChatroomRepository> {
    user_repo: Arc<U>,
    party_repo: Arc<P>,
    chatroom_repo: Arc<C>,
}

impl<U: UserRepository, P: PartyRepository, C: ChatroomRepository> GetParty<U, P, C> {
    pub fn new(user_repo: Arc<U>, party_repo: Arc<P>, chatroom_repo: Arc<C>) -> Self {
        Self {
            user_repo,
            party_repo,
            chatroom_repo,
        }
    }

    pub async fn execute(&self, input: GetPartyInput) -> Result<GetPartyOutput, GetPartyError> {
        let mut party = self
            .party_repo
            .find_by_id(&input.party_id)
            .await?
            .ok_or(GetPartyError::PartyNotFound)?;

        let (resumed_chatroom, _) =
            CompleteParty::new(self.party_repo.clone(), self.chatroom_repo.clone())
                .complete_if_full(&mut party)
                .await
                .into_parts();

        let users = self.user_repo.find_by_ids(&party.users).await?;
        let members = party
            .users
            .iter()
            .map(|id| PartyMember {
                user_id: id.clone(),
                username: users
                    .iter()
                    .find(|u| &u.id == id)
                    .map(|u| u.username.clone()),
            })
            .collect();

        Ok(GetPartyOutput {
            is_member: party.is_member(&input.user_id),
            is_stale: party.is_stale(input.cutoff_millis),
            members,
            resumed_chatroom,
            party,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GetPartyError {
    #[error("Party not found")]
    PartyNotFound,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
