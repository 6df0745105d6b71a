use thiserror::Error;
use watchparty_core::{CaptureKind, PeerId, RoomId};

/// Failures surfaced by session operations.
///
/// Protocol failures stop at the operation boundary: they come back as the
/// `Err` of the API call and, where the user should hear about it, as a
/// [`SessionNotice`](crate::SessionNotice). None of them tear down the event loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The connectivity provider could not be reached or refused the identity.
    #[error("Peer connectivity is unavailable: {0}")]
    TransportUnavailable(String),

    /// One outbound connection failed; the peer stays absent from the roster.
    #[error("Could not connect to {peer}: {reason}")]
    ConnectFailed { peer: PeerId, reason: String },

    /// Wrong room password.
    #[error("The room password was rejected")]
    AuthRejected,

    /// The user or OS declined a capture permission prompt.
    #[error("{kind} capture was denied: {reason}")]
    CaptureDenied { kind: CaptureKind, reason: String },

    /// The room is past its expiry window.
    #[error("Room {0} has expired")]
    RoomExpired(RoomId),

    /// Inbound payload with an unknown type or missing fields.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Failed to send to {peer}: {reason}")]
    SendFailed { peer: PeerId, reason: String },

    /// Operation not valid in the current phase (e.g. joining while hosting).
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// The session task has shut down.
    #[error("Session is no longer running")]
    SessionClosed,
}

impl SessionError {
    pub fn connect_failed(peer: &PeerId, reason: impl Into<String>) -> Self {
        SessionError::ConnectFailed {
            peer: peer.clone(),
            reason: reason.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        SessionError::InvalidState(msg.into())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::MalformedMessage(e.to_string())
    }
}
