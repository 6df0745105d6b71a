mod message_handler;
mod message_router;

pub use message_handler::*;
pub use message_router::*;
