use crate::transport::{CallId, ChannelId, DataChannel, MediaCall};
use bytes::Bytes;
use std::sync::Arc;
use watchparty_core::{MediaStream, PeerId};

/// Events the connectivity provider pushes into the session loop.
pub enum TransportEvent {
    /// A data channel is open in both directions. `initiated_locally` tells
    /// which side dialed, used to break ties between simultaneous dials.
    ChannelOpened {
        peer: PeerId,
        channel: Arc<dyn DataChannel>,
        initiated_locally: bool,
    },

    /// An outbound dial failed before a channel opened.
    ConnectFailed { peer: PeerId, reason: String },

    /// A payload arrived on an open channel.
    Message {
        peer: PeerId,
        channel: ChannelId,
        data: Bytes,
    },

    /// The channel is gone, whichever side closed it.
    ChannelClosed { peer: PeerId, channel: ChannelId },

    /// A remote peer is calling us; answer through the handle.
    IncomingCall {
        peer: PeerId,
        call: Arc<dyn MediaCall>,
    },

    /// Remote tracks became available on a call.
    RemoteStream {
        peer: PeerId,
        call: CallId,
        stream: MediaStream,
    },

    CallClosed { peer: PeerId, call: CallId },
}

impl TransportEvent {
    pub fn peer(&self) -> &PeerId {
        match self {
            TransportEvent::ChannelOpened { peer, .. }
            | TransportEvent::ConnectFailed { peer, .. }
            | TransportEvent::Message { peer, .. }
            | TransportEvent::ChannelClosed { peer, .. }
            | TransportEvent::IncomingCall { peer, .. }
            | TransportEvent::RemoteStream { peer, .. }
            | TransportEvent::CallClosed { peer, .. } => peer,
        }
    }
}
