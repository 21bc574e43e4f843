mod complete_party;
mod get_party;
mod join_or_create_party;
mod join_party;
mod leave_party;
mod list_parties;

pub use complete_party::*;
pub use get_party::*;
pub use join_or_create_party::*;
pub use join_party::*;
pub use leave_party::*;
pub use list_parties::*;
