use std::sync::Arc;

use crate::domain::entities::Chatroom;
use crate::domain::repositories::{ChatroomRepository, RepositoryError};

/// Get chatroom input
pub struct GetChatroomInput {
    pub chatroom_id: String,
    pub user_id: String,
}

/// Read a chatroom the caller is a member of
pub struct GetChatroom<C: ChatroomRepository> {
    chatroom_repo: Arc<C>,
}

impl<C: ChatroomRepository> GetChatroom<C> {
    pub fn new(chatroom_repo: Arc<C>) -> Self {
        Self { chatroom_repo }
    }

    pub async fn execute(&self, input: GetChatroomInput) -> Result<Chatroom, ChatroomAccessError> {
        load_for_member(self.chatroom_repo.as_ref(), &input.chatroom_id, &input.user_id).await
    }
}

/// Shared by every chat use case: the room must exist and the user must be in it
pub(crate) async fn load_for_member<C: ChatroomRepository + ?Sized>(
    repo: &C,
    chatroom_id: &str,
    user_id: &str,
) -> Result<Chatroom, ChatroomAccessError> {
    let chatroom = repo
        .find_by_id(chatroom_id)
        .await?
        .ok_or(ChatroomAccessError::ChatroomNotFound)?;
    if !chatroom.is_member(user_id) {
        return Err(ChatroomAccessError::NotMember);
    }
    Ok(chatroom)
}

#[derive(Debug, thiserror::Error)]
pub enum ChatroomAccessError {
    #[error("Chatroom not found")]
    ChatroomNotFound,
    #[error("Not a member of this chatroom")]
    NotMember,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
