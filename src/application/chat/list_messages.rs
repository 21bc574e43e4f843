use std::sync::Arc;

use crate::application::chat::{load_for_member, ChatroomAccessError};
use crate::domain::entities::ChatMessage;
use crate::domain::repositories::{ChatroomRepository, RepositoryError};

pub const DEFAULT_MESSAGE_PAGE: u32 = 50;
pub const MAX_MESSAGE_PAGE: u32 = 100;

/// List messages input
pub struct ListMessagesInput {
    pub chatroom_id: String,
    pub user_id: String,
    /// Id of the oldest message already shown; only older messages are returned
    pub before: Option<String>,
    pub limit: Option<u32>,
}

/// Page through a chatroom's history, newest first
pub struct ListMessages<C: ChatroomRepository> {
    chatroom_repo: Arc<C>,
}

impl<C: ChatroomRepository> ListMessages<C> {
    pub fn new(chatroom_repo: Arc<C>) -> Self {
        Self { chatroom_repo }
    }

    pub async fn execute(
        &self,
        input: ListMessagesInput,
    ) -> Result<Vec<ChatMessage>, ListMessagesError> {
        load_for_member(self.chatroom_repo.as_ref(), &input.chatroom_id, &input.user_id).await?;

        let limit = input
            .limit
            .unwrap_or(DEFAULT_MESSAGE_PAGE)
            .clamp(1, MAX_MESSAGE_PAGE);

        Ok(self
            .chatroom_repo
            .list_messages(&input.chatroom_id, input.before.as_deref(), limit)
            .await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListMessagesError {
    #[error(transparent)]
    Access(#[from] ChatroomAccessError),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::chat::test_support::seeded_chatroom;

    #[tokio::test]
    async fn pages_history_newest_first() {
        let (repo, chatroom) = seeded_chatroom().await;
        for (i, text) in ["one", "two", "three"].iter().enumerate() {
            let mut message = ChatMessage::new(
                format!("m{i}"),
                chatroom.id.clone(),
                "A".into(),
                text.to_string(),
            );
            message.created_at = 1_000;
            repo.save_message(&message).await.unwrap();
        }
        let list = ListMessages::new(repo);

        let page = list
            .execute(ListMessagesInput {
                chatroom_id: chatroom.id.clone(),
                user_id: "B".into(),
                before: None,
                limit: Some(2),
            })
            .await
            .unwrap();
        let bodies: Vec<_> = page.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["three", "two"]);

        let older = list
            .execute(ListMessagesInput {
                chatroom_id: chatroom.id.clone(),
                user_id: "B".into(),
                before: Some(page[1].id.clone()),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(older.len(), 1);
        assert_eq!(older[0].body, "one");

        assert!(matches!(
            list.execute(ListMessagesInput {
                chatroom_id: chatroom.id.clone(),
                user_id: "Z".into(),
                before: None,
                limit: None,
            })
            .await,
            Err(ListMessagesError::Access(ChatroomAccessError::NotMember))
        ));
    }
}
