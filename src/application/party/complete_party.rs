use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entities::{Chatroom, Party};
use crate::domain::repositories::{ChatroomRepository, PartyRepository, RepositoryError};

/// Result of handing a party off after a committed join
#[derive(Debug)]
pub enum Handoff {
    /// The party still has room
    NotFull,
    Completed(Chatroom),
    /// The party is full but the chatroom could not be created yet
    Pending,
}

impl Handoff {
    /// Split into the chatroom to announce and the pending flag
    pub fn into_parts(self) -> (Option<Chatroom>, bool) {
        match self {
            Handoff::NotFull => (None, false),
            Handoff::Completed(chatroom) => (Some(chatroom), false),
            Handoff::Pending => (None, true),
        }
    }
}

/// Hand a filled party off to a persistent chatroom
pub struct CompleteParty<P: PartyRepository, C: ChatroomRepository> {
    party_repo: Arc<P>,
    chatroom_repo: Arc<C>,
}

impl<P: PartyRepository, C: ChatroomRepository> CompleteParty<P, C> {
    pub fn new(party_repo: Arc<P>, chatroom_repo: Arc<C>) -> Self {
        Self {
            party_repo,
            chatroom_repo,
        }
    }

    /// Create the chatroom, then claim the party for it.
    ///
    /// Only one claim succeeds. A caller that loses discards its own
    /// chatroom and returns the one that won.
    pub async fn execute(&self, party: &Party) -> Result<Chatroom, CompletePartyError> {
        if !party.is_full() {
            return Err(CompletePartyError::NotFull);
        }

        let chatroom = Chatroom::from_party(Uuid::new_v4().to_string(), party);
        self.chatroom_repo.create(&chatroom).await?;

        if self
            .party_repo
            .mark_chatroom_created(&party.id, &chatroom.id)
            .await?
        {
            tracing::info!(
                party_id = %party.id,
                chatroom_id = %chatroom.id,
                members = chatroom.member_ids.len(),
                "party filled, chatroom created"
            );
            return Ok(chatroom);
        }

        self.chatroom_repo.delete(&chatroom.id).await?;
        tracing::debug!(party_id = %party.id, "handoff already claimed, discarded duplicate chatroom");

        let winner_id = self
            .party_repo
            .find_by_id(&party.id)
            .await?
            .and_then(|p| p.chatroom_id)
            .ok_or(CompletePartyError::PartyGone)?;
        self.chatroom_repo
            .find_by_id(&winner_id)
            .await?
            .ok_or(CompletePartyError::PartyGone)
    }

    /// Hand `party` off if it is full and not yet handed off, recording the
    /// chatroom on it. Failures are logged and reported as pending so a
    /// committed join still stands; readers of the party retry later.
    pub async fn complete_if_full(&self, party: &mut Party) -> Handoff {
        if !party.is_full() || party.chatroom_created {
            return Handoff::NotFull;
        }

        match self.execute(party).await {
            Ok(chatroom) => {
                party.chatroom_created = true;
                party.chatroom_id = Some(chatroom.id.clone());
                Handoff::Completed(chatroom)
            }
            Err(e) => {
                tracing::error!(party_id = %party.id, error = %e, "chatroom handoff failed, left pending");
                Handoff::Pending
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompletePartyError {
    #[error("Party is not full")]
    NotFull,
    #[error("Party disappeared during handoff")]
    PartyGone,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
