mod chatroom;
mod party;
mod user;

pub use chatroom::*;
pub use party::*;
pub use user::*;
