mod memory;
mod peer_transport;
mod provider;
mod transport_event;

pub use memory::*;
pub use peer_transport::*;
pub use provider::*;
pub use transport_event::*;
