use std::sync::Arc;

use crate::application::party::CompleteParty;
use crate::domain::entities::{Chatroom, Party};
use crate::domain::repositories::{
    ChatroomRepository, PartyRepository, PartyTransactionError, RepositoryError,
};

/// Join party input
pub struct JoinPartyInput {
    pub user_id: String,
    pub party_id: String,
    /// Parties created at or before this instant (ms) cannot be joined
    pub cutoff_millis: i64,
}

/// Join party output
pub struct JoinPartyOutput {
    pub party: Party,
    /// Set when this join filled the party
    pub chatroom: Option<Chatroom>,
    /// The join filled the party but the chatroom is not created yet
    pub handoff_pending: bool,
}

/// Join a specific party picked from the lobby
pub struct JoinParty<P: PartyRepository, C: ChatroomRepository> {
    party_repo: Arc<P>,
    chatroom_repo: Arc<C>,
}

impl<P: PartyRepository, C: ChatroomRepository> JoinParty<P, C> {
    pub fn new(party_repo: Arc<P>, chatroom_repo: Arc<C>) -> Self {
        Self {
            party_repo,
            chatroom_repo,
        }
    }

    pub async fn execute(&self, input: JoinPartyInput) -> Result<JoinPartyOutput, JoinPartyError> {
        let cached = self
            .party_repo
            .find_by_id(&input.party_id)
            .await?
            .ok_or(JoinPartyError::PartyNotFound)?;

        if cached.is_stale(input.cutoff_millis) {
            return Err(JoinPartyError::PartyStale);
        }

        let mut party = self
            .party_repo
            .join(&input.party_id, &input.user_id)
            .await
            .map_err(JoinPartyError::from)?;

        tracing::info!(party_id = %party.id, user_id = %input.user_id, "joined party");

        let (chatroom, handoff_pending) =
            CompleteParty::new(self.party_repo.clone(), self.chatroom_repo.clone())
                .complete_if_full(&mut party)
                .await
                .into_parts();

        Ok(JoinPartyOutput {
            party,
            chatroom,
            handoff_pending,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JoinPartyError {
    #[error("Party not found")]
    PartyNotFound,
    #[error("Party has expired")]
    PartyStale,
    #[error("Already in party")]
    AlreadyInParty,
    #[error("Party is full")]
    PartyFull,
    #[error("Party chatroom already created")]
    PartyClosed,
    #[error("Party is busy, try again")]
    Contention,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PartyTransactionError> for JoinPartyError {
    fn from(err: PartyTransactionError) -> Self {
        match err {
            PartyTransactionError::NotFound => JoinPartyError::PartyNotFound,
            PartyTransactionError::AlreadyJoined => JoinPartyError::AlreadyInParty,
            PartyTransactionError::Full => JoinPartyError::PartyFull,
            PartyTransactionError::Closed => JoinPartyError::PartyClosed,
            PartyTransactionError::Contention => JoinPartyError::Contention,
            // Join never removes a member
            PartyTransactionError::NotMember => JoinPartyError::PartyNotFound,
            PartyTransactionError::Repository(e) => JoinPartyError::Repository(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::party::test_support::{duo_party, FlakyChatrooms};
    use crate::infrastructure::database::repositories::SqlitePartyRepository;
    use crate::infrastructure::database::test_pool;

    async fn setup() -> (
        JoinParty<SqlitePartyRepository, FlakyChatrooms>,
        Arc<FlakyChatrooms>,
        Party,
    ) {
        let pool = test_pool().await;
        let parties = Arc::new(SqlitePartyRepository::new(pool.clone()));
        let chatrooms = Arc::new(FlakyChatrooms::new(pool));
        let party = duo_party(&parties).await;
        (JoinParty::new(parties, chatrooms.clone()), chatrooms, party)
    }

    fn input(user: &str, party: &Party, cutoff_millis: i64) -> JoinPartyInput {
        JoinPartyInput {
            user_id: user.into(),
            party_id: party.id.clone(),
            cutoff_millis,
        }
    }

    #[tokio::test]
    async fn filling_join_hands_off_and_closes_party() {
        let (join, _, party) = setup().await;

        let output = join
            .execute(input("B", &party, party.created_at - 1))
            .await
            .unwrap();
        assert!(!output.handoff_pending);
        let chatroom = output.chatroom.expect("party filled");
        assert_eq!(chatroom.party_id, party.id);
        assert!(output.party.chatroom_created);
        assert_eq!(output.party.chatroom_id.as_deref(), Some(chatroom.id.as_str()));

        let late = join.execute(input("C", &party, party.created_at - 1)).await;
        assert!(matches!(late, Err(JoinPartyError::PartyClosed)));
    }

    #[tokio::test]
    async fn failed_handoff_keeps_the_committed_join() {
        let (join, chatrooms, party) = setup().await;
        chatrooms.fail_creates(true);

        let output = join
            .execute(input("B", &party, party.created_at - 1))
            .await
            .unwrap();
        assert!(output.handoff_pending);
        assert!(output.chatroom.is_none());
        assert_eq!(output.party.users, vec!["A", "B"]);
        assert!(!output.party.chatroom_created);
    }

    #[tokio::test]
    async fn stale_party_cannot_be_joined() {
        let (join, _, party) = setup().await;

        let result = join.execute(input("B", &party, party.created_at)).await;

        assert!(matches!(result, Err(JoinPartyError::PartyStale)));
    }
}
