use crate::model::control::InputDescriptor;
use crate::model::peer::PeerId;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Why a host turned a join attempt away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    #[default]
    WrongPassword,
    RoomExpired,
}

/// Every payload exchanged over a peer data channel.
///
/// Encoded as a JSON object tagged by `type`. Tags the local build does not
/// know decode to [`WireMessage::Unrecognized`] instead of failing, so a newer
/// peer cannot crash an older one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireMessage {
    #[serde(rename_all = "camelCase")]
    JoinRequest {
        password: String,
        username: String,
        peer_identity: PeerId,
    },
    #[serde(rename_all = "camelCase")]
    JoinAccepted {
        peers: Vec<PeerId>,
        create_time: u64,
    },
    JoinRejected {
        #[serde(default)]
        reason: RejectReason,
    },
    Chat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        sender: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    ControlRequest,
    #[serde(rename_all = "camelCase")]
    ControlGrant {
        stream_width: u32,
        stream_height: u32,
    },
    ControlRevoke,
    ControlEvent {
        event: InputDescriptor,
    },
    PeerListUpdate {
        peers: Vec<PeerId>,
    },
    RoomDestroyed,
    /// Sent whenever a peer enters the receiver's roster so mesh peers learn
    /// each other's names without going through the host.
    #[serde(rename_all = "camelCase")]
    Hello {
        username: String,
        is_host: bool,
        audio_enabled: bool,
        video_enabled: bool,
    },
    #[serde(rename_all = "camelCase")]
    MediaState {
        audio_enabled: bool,
        video_enabled: bool,
    },
    #[serde(other, skip_serializing)]
    Unrecognized,
}

#[derive(Deserialize)]
struct TagOnly {
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl WireMessage {
    pub fn encode(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Best-effort peek at the `type` tag, for logging payloads that did not decode.
    pub fn peek_type(payload: &[u8]) -> Option<String> {
        serde_json::from_slice::<TagOnly>(payload)
            .ok()
            .and_then(|t| t.kind)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            WireMessage::JoinRequest { .. } => "join-request",
            WireMessage::JoinAccepted { .. } => "join-accepted",
            WireMessage::JoinRejected { .. } => "join-rejected",
            WireMessage::Chat { .. } => "chat",
            WireMessage::ControlRequest => "control-request",
            WireMessage::ControlGrant { .. } => "control-grant",
            WireMessage::ControlRevoke => "control-revoke",
            WireMessage::ControlEvent { .. } => "control-event",
            WireMessage::PeerListUpdate { .. } => "peer-list-update",
            WireMessage::RoomDestroyed => "room-destroyed",
            WireMessage::Hello { .. } => "hello",
            WireMessage::MediaState { .. } => "media-state",
            WireMessage::Unrecognized => "unrecognized",
        }
    }
}
