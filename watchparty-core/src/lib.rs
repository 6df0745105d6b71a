//! Shared data model and wire vocabulary for watch-party sessions.
//!
//! Everything here is plain data: identities, rooms, chat entries, media
//! descriptors, remote-control descriptors, and the tagged [`WireMessage`]
//! exchanged over every peer data channel.

pub mod model;

pub use model::*;
