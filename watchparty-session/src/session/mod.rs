mod context;
mod environment;
mod observer;
mod session;
mod session_command;
mod session_handle;
mod snapshot;

pub use context::*;
pub use environment::*;
pub use observer::*;
pub use session::*;
pub(crate) use session_command::*;
pub use session_handle::*;
pub use snapshot::*;
