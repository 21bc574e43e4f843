mod chatroom_repo;
mod party_repo;
mod user_repo;

pub use chatroom_repo::*;
pub use party_repo::*;
pub use user_repo::*;
