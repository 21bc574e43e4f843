mod event_bus;
mod voice_engine;
mod voice_manager;

pub use event_bus::*;
pub use voice_engine::*;
pub use voice_manager::*;
