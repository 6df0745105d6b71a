mod coordinator;
mod devices;
mod playback;

pub use coordinator::*;
pub use devices::*;
pub use playback::*;
