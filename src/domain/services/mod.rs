mod voice_session;

pub use voice_session::*;
