mod chat;
mod control;
mod media;
mod message;
mod peer;
mod room;

pub use chat::ChatMessage;
pub use control::{
    CapturedInput, InputDescriptor, InputKind, Modifiers, NormalizedPoint, StreamDimensions,
    VideoRect,
};
pub use media::{CaptureKind, MediaStream, MediaTrack, TrackKind, TrackSettings};
pub use message::{RejectReason, WireMessage};
pub use peer::PeerId;
pub use room::{DEFAULT_EXPIRY, Room, RoomId};
