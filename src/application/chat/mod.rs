mod get_chatroom;
mod list_chatrooms;
mod list_messages;
mod post_message;

pub use get_chatroom::*;
pub use list_chatrooms::*;
pub use list_messages::*;
pub use post_message::*;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::domain::entities::{Chatroom, Party};
    use crate::domain::repositories::ChatroomRepository;
    use crate::domain::value_objects::{GameRef, TagSet};
    use crate::infrastructure::database::repositories::SqliteChatroomRepository;
    use crate::infrastructure::database::test_pool;

    /// A chatroom with members A and B
    pub async fn seeded_chatroom() -> (Arc<SqliteChatroomRepository>, Chatroom) {
        let repo = Arc::new(SqliteChatroomRepository::new(test_pool().await));
        let game = GameRef {
            id: "overwatch".into(),
            name: "Overwatch 2".into(),
            cover_url: None,
        };
        let mut party = Party::new("p1".into(), game, TagSet::new(vec![]).unwrap(), "A".into());
        party.users.push("B".into());
        let chatroom = Chatroom::from_party("c1".into(), &party);
        repo.create(&chatroom).await.unwrap();
        (repo, chatroom)
    }
}
