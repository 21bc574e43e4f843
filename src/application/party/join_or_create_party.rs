use std::sync::Arc;

use uuid::Uuid;

use crate::application::party::CompleteParty;
use crate::domain::entities::{Chatroom, Party};
use crate::domain::repositories::{
    ChatroomRepository, PartyRepository, PartyTransactionError, RepositoryError,
};
use crate::domain::value_objects::{GameRef, Tag, TagSet, TagSetError};

/// Query-then-join rounds before giving up on a busy tag-set
pub const MAX_MATCH_ATTEMPTS: u32 = 3;

/// Matchmaking input
pub struct JoinOrCreatePartyInput {
    pub user_id: String,
    pub game: GameRef,
    pub tags: Vec<Tag>,
    /// Parties created at or before this instant (ms) are ignored
    pub cutoff_millis: i64,
}

/// Matchmaking output
pub struct JoinOrCreatePartyOutput {
    pub party: Party,
    /// True when no joinable party existed and a new one was created
    pub created: bool,
    /// Set when this join filled the party
    pub chatroom: Option<Chatroom>,
    /// The join filled the party but the chatroom is not created yet
    pub handoff_pending: bool,
}

/// Join the oldest open party for (game, tag-set), or start one
pub struct JoinOrCreateParty<P: PartyRepository, C: ChatroomRepository> {
    party_repo: Arc<P>,
    chatroom_repo: Arc<C>,
}

impl<P: PartyRepository, C: ChatroomRepository> JoinOrCreateParty<P, C> {
    pub fn new(party_repo: Arc<P>, chatroom_repo: Arc<C>) -> Self {
        Self {
            party_repo,
            chatroom_repo,
        }
    }

    pub async fn execute(
        &self,
        input: JoinOrCreatePartyInput,
    ) -> Result<JoinOrCreatePartyOutput, JoinOrCreatePartyError> {
        input
            .game
            .validate()
            .map_err(|e| JoinOrCreatePartyError::Validation(e.to_string()))?;
        let tag_set = TagSet::new(input.tags)?;
        let tag_ids = tag_set.tag_ids();

        for attempt in 1..=MAX_MATCH_ATTEMPTS {
            let candidate = self
                .party_repo
                .find_open_party(&input.game.id, &tag_ids, input.cutoff_millis)
                .await?;

            let Some(candidate) = candidate else {
                let party = Party::new(
                    Uuid::new_v4().to_string(),
                    input.game.clone(),
                    tag_set.clone(),
                    input.user_id.clone(),
                );
                self.party_repo.create(&party).await?;

                tracing::info!(
                    party_id = %party.id,
                    game_id = %party.game.id,
                    user_id = %input.user_id,
                    max_size = party.max_size,
                    "created party"
                );
                return Ok(JoinOrCreatePartyOutput {
                    party,
                    created: true,
                    chatroom: None,
                    handoff_pending: false,
                });
            };

            match self.party_repo.join(&candidate.id, &input.user_id).await {
                Ok(mut party) => {
                    tracing::info!(party_id = %party.id, user_id = %input.user_id, "matched into party");
                    let (chatroom, handoff_pending) =
                        CompleteParty::new(self.party_repo.clone(), self.chatroom_repo.clone())
                            .complete_if_full(&mut party)
                            .await
                            .into_parts();
                    return Ok(JoinOrCreatePartyOutput {
                        party,
                        created: false,
                        chatroom,
                        handoff_pending,
                    });
                }
                Err(PartyTransactionError::AlreadyJoined) => {
                    return Err(JoinOrCreatePartyError::AlreadyInParty(candidate.id));
                }
                // No longer joinable; look again
                Err(
                    PartyTransactionError::Full
                    | PartyTransactionError::Closed
                    | PartyTransactionError::NotFound,
                ) => {
                    tracing::debug!(
                        party_id = %candidate.id,
                        attempt,
                        "party no longer joinable, re-querying"
                    );
                }
                // NotMember cannot come out of a join
                Err(PartyTransactionError::Contention | PartyTransactionError::NotMember) => {
                    return Err(JoinOrCreatePartyError::Contention);
                }
                Err(PartyTransactionError::Repository(e)) => return Err(e.into()),
            }
        }

        tracing::warn!(game_id = %input.game.id, "gave up matching after repeated races");
        Err(JoinOrCreatePartyError::NoJoinableParty)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JoinOrCreatePartyError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid tags: {0}")]
    InvalidTags(#[from] TagSetError),
    #[error("Already in party {0}")]
    AlreadyInParty(String),
    #[error("No joinable party after {MAX_MATCH_ATTEMPTS} attempts")]
    NoJoinableParty,
    #[error("Matchmaking is busy, try again")]
    Contention,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
