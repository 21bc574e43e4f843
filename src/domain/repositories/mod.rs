mod chatroom_repository;
mod party_repository;
mod user_repository;

pub use chatroom_repository::*;
pub use party_repository::*;
pub use user_repository::*;
