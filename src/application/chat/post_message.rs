use std::sync::Arc;

use uuid::Uuid;

use crate::application::chat::{load_for_member, ChatroomAccessError};
use crate::domain::entities::{normalize_message_body, ChatMessage, Chatroom};
use crate::domain::repositories::{ChatroomRepository, RepositoryError};

/// Post message input
pub struct PostMessageInput {
    pub chatroom_id: String,
    pub user_id: String,
    pub body: String,
}

/// Post message output
pub struct PostMessageOutput {
    pub message: ChatMessage,
    /// Recipients of the broadcast
    pub chatroom: Chatroom,
}

/// Append a message to a chatroom's history
pub struct PostMessage<C: ChatroomRepository> {
    chatroom_repo: Arc<C>,
}

impl<C: ChatroomRepository> PostMessage<C> {
    pub fn new(chatroom_repo: Arc<C>) -> Self {
        Self { chatroom_repo }
    }

    pub async fn execute(
        &self,
        input: PostMessageInput,
    ) -> Result<PostMessageOutput, PostMessageError> {
        let body = normalize_message_body(&input.body)
            .map_err(|e| PostMessageError::Validation(e.to_string()))?;

        let chatroom =
            load_for_member(self.chatroom_repo.as_ref(), &input.chatroom_id, &input.user_id)
                .await?;

        let message = ChatMessage::new(
            Uuid::new_v4().to_string(),
            chatroom.id.clone(),
            input.user_id,
            body,
        );
        self.chatroom_repo.save_message(&message).await?;

        tracing::debug!(chatroom_id = %chatroom.id, sender_id = %message.sender_id, "message posted");

        Ok(PostMessageOutput { message, chatroom })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PostMessageError {
    #[error("Validation error: {0}")]
    Validation(String),
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
    async fn member_posts_trimmed_message() {
        let (repo, chatroom) = seeded_chatroom().await;

        let output = PostMessage::new(repo.clone())
            .execute(PostMessageInput {
                chatroom_id: chatroom.id.clone(),
                user_id: "A".into(),
                body: "  glhf  ".into(),
            })
            .await
            .unwrap();

        assert_eq!(output.message.body, "glhf");
        let history = repo.list_messages(&chatroom.id, None, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sender_id, "A");
    }

    #[tokio::test]
    async fn rejects_outsiders_and_blank_messages() {
        let (repo, chatroom) = seeded_chatroom().await;
        let post = PostMessage::new(repo);

        assert!(matches!(
            post.execute(PostMessageInput {
                chatroom_id: chatroom.id.clone(),
                user_id: "C".into(),
                body: "let me in".into(),
            })
            .await,
            Err(PostMessageError::Access(ChatroomAccessError::NotMember))
        ));
        assert!(matches!(
            post.execute(PostMessageInput {
                chatroom_id: chatroom.id.clone(),
                user_id: "A".into(),
                body: "   ".into(),
            })
            .await,
            Err(PostMessageError::Validation(_))
        ));
    }
}
