//! Peer-to-peer watch-party sessions.
//!
//! A [`Session`] is one participant's event loop: it owns the transport,
//! the room roster, the media calls and the remote-control grants, and is
//! driven through a cloneable [`SessionHandle`]. What happens in the room is
//! reported to a [`SessionObserver`].
//!
//! Room passwords and the six-hour expiry are checked by the host's own
//! client and nothing else. Anyone who can reach the host's identity and
//! runs a modified client can skip both, so neither is a security boundary.

pub mod chat;
pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod media;
pub mod membership;
pub mod router;
pub mod session;
pub mod transport;

pub use chat::ChatLog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use control::{
    DispatchTarget, ElementRef, NullSurface, RemoteControlBridge, ReplaySurface, SyntheticEvent,
    Viewport,
};
pub use error::SessionError;
pub use media::{
    CaptureDevices, CaptureError, CapturedStream, MediaStreamCoordinator, NullPlayback,
    PlaybackSink, StaticDevices, StreamAttachment,
};
pub use membership::{JoinedRoom, Participant, SessionPhase};
pub use session::{
    ChannelObserver, ParticipantInfo, Session, SessionEnvironment, SessionHandle, SessionNotice,
    SessionObserver, SessionSnapshot, TracingObserver,
};
pub use transport::{
    ConnectivityProvider, DataChannel, MediaCall, MemoryNetwork, PeerEndpoint, PeerTransport,
    TransportEvent,
};
