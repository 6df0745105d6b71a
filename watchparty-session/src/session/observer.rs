use crate::error::SessionError;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;
use tracing::info;
use watchparty_core::{CaptureKind, ChatMessage, PeerId, RoomId, StreamDimensions};

/// Something the user should hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    RoomCreated { room_id: RoomId },
    Joined { room_id: RoomId },
    JoinFailed { error: SessionError },
    ParticipantJoined { peer: PeerId, username: String },
    ParticipantLeft { peer: PeerId },
    ChatReceived(ChatMessage),
    ControlRequested { peer: PeerId },
    ControlGranted { by: PeerId, dims: StreamDimensions },
    ControlRevoked { by: PeerId },
    ScreenShareEnded,
    CaptureDenied { kind: CaptureKind, reason: String },
    RemoteStreamAttached { peer: PeerId },
    RemoteStreamDetached { peer: PeerId },
    PeerUnreachable { peer: PeerId, reason: String },
    RoomDestroyed { room_id: RoomId },
    RoomExpired { room_id: RoomId },
}

impl fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionNotice::RoomCreated { room_id } => write!(f, "Room {room_id} is open"),
            SessionNotice::Joined { room_id } => write!(f, "Joined room {room_id}"),
            SessionNotice::JoinFailed { error } => write!(f, "Could not join: {error}"),
            SessionNotice::ParticipantJoined { peer, username } => {
                write!(f, "{username} ({peer}) joined")
            }
            SessionNotice::ParticipantLeft { peer } => write!(f, "{peer} left"),
            SessionNotice::ChatReceived(msg) => write!(f, "{}: {}", msg.sender, msg.text),
            SessionNotice::ControlRequested { peer } => {
                write!(f, "{peer} asks for remote control")
            }
            SessionNotice::ControlGranted { by, dims } => write!(
                f,
                "{by} granted remote control ({}x{})",
                dims.width, dims.height
            ),
            SessionNotice::ControlRevoked { by } => write!(f, "{by} revoked remote control"),
            SessionNotice::ScreenShareEnded => write!(f, "Screen sharing ended"),
            SessionNotice::CaptureDenied { kind, reason } => {
                write!(f, "{kind} access denied: {reason}")
            }
            SessionNotice::RemoteStreamAttached { peer } => {
                write!(f, "Receiving media from {peer}")
            }
            SessionNotice::RemoteStreamDetached { peer } => {
                write!(f, "Media from {peer} stopped")
            }
            SessionNotice::PeerUnreachable { peer, reason } => {
                write!(f, "Could not reach {peer}: {reason}")
            }
            SessionNotice::RoomDestroyed { room_id } => write!(f, "Room {room_id} was closed"),
            SessionNotice::RoomExpired { room_id } => write!(f, "Room {room_id} has expired"),
        }
    }
}

#[async_trait]
pub trait SessionObserver: Send + Sync + 'static {
    async fn on_notice(&self, notice: SessionNotice);
}

/// Writes every notice to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

#[async_trait]
impl SessionObserver for TracingObserver {
    async fn on_notice(&self, notice: SessionNotice) {
        info!("{}", notice);
    }
}

/// Forwards notices into a channel, for callers that drive their own loop.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionNotice>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SessionObserver for ChannelObserver {
    async fn on_notice(&self, notice: SessionNotice) {
        let _ = self.tx.send(notice);
    }
}
