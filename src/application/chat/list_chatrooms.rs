use std::sync::Arc;

use crate::domain::entities::Chatroom;
use crate::domain::repositories::{ChatroomRepository, RepositoryError};

/// Chatrooms the user belongs to, newest first
pub struct ListMyChatrooms<C: ChatroomRepository> {
    chatroom_repo: Arc<C>,
}

impl<C: ChatroomRepository> ListMyChatrooms<C> {
    pub fn new(chatroom_repo: Arc<C>) -> Self {
        Self { chatroom_repo }
    }

    pub async fn execute(&self, user_id: &str) -> Result<Vec<Chatroom>, ListChatroomsError> {
        Ok(self.chatroom_repo.find_for_member(user_id).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListChatroomsError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
