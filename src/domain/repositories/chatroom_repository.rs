use async_trait::async_trait;

use crate::domain::entities::{ChatMessage, Chatroom};
use crate::domain::repositories::RepositoryError;

/// Chatroom and message history repository
#[async_trait]
pub trait ChatroomRepository: Send + Sync {
    async fn create(&self, chatroom: &Chatroom) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Chatroom>, RepositoryError>;

    /// Remove a chatroom with its members and messages
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;

    /// Chatrooms the user belongs to, newest first
    async fn find_for_member(&self, user_id: &str) -> Result<Vec<Chatroom>, RepositoryError>;

    async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError>;

    /// Messages older than the message `before` (all if None), newest first.
    /// Ties on `created_at` are broken by insertion order.
    async fn list_messages(
        &self,
        chatroom_id: &str,
        before: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;
}
