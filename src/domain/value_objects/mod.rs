mod game_ref;
mod tag_set;

pub use game_ref::*;
pub use tag_set::*;
