use crate::error::SessionError;
use crate::router::MessageHandler;
use tracing::{debug, warn};
use watchparty_core::{PeerId, WireMessage};

/// What happened to one inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Handled(&'static str),
    /// Not valid JSON, or a known type with missing fields.
    Malformed(SessionError),
    /// Well-formed but of a type this build does not know.
    Unrecognized(Option<String>),
}

/// Running totals, reported in snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub routed: u64,
    pub dropped: u64,
}

impl RouterStats {
    pub fn record(&mut self, outcome: &RouteOutcome) {
        match outcome {
            RouteOutcome::Handled(_) => self.routed += 1,
            RouteOutcome::Malformed(_) | RouteOutcome::Unrecognized(_) => self.dropped += 1,
        }
    }
}

/// Decodes inbound payloads and hands each to exactly one handler method.
pub struct MessageRouter;

impl MessageRouter {
    pub async fn dispatch<H: MessageHandler + ?Sized>(
        handler: &mut H,
        from: PeerId,
        payload: &[u8],
    ) -> RouteOutcome {
        let message = match WireMessage::decode(payload) {
            Ok(m) => m,
            Err(e) => {
                warn!(
                    "Dropping malformed {} from {}: {}",
                    WireMessage::peek_type(payload).as_deref().unwrap_or("payload"),
                    from,
                    e
                );
                return RouteOutcome::Malformed(e.into());
            }
        };

        let kind = message.type_name();
        debug!("<- {} {}", from, kind);

        match message {
            WireMessage::JoinRequest {
                password,
                username,
                peer_identity,
            } => {
                handler
                    .on_join_request(from, password, username, peer_identity)
                    .await
            }
            WireMessage::JoinAccepted { peers, create_time } => {
                handler.on_join_accepted(from, peers, create_time).await
            }
            WireMessage::JoinRejected { reason } => handler.on_join_rejected(from, reason).await,
            WireMessage::Chat {
                id,
                sender,
                text,
                timestamp,
            } => handler.on_chat(from, id, sender, text, timestamp).await,
            WireMessage::ControlRequest => handler.on_control_request(from).await,
            WireMessage::ControlGrant {
                stream_width,
                stream_height,
            } => {
                handler
                    .on_control_grant(from, stream_width, stream_height)
                    .await
            }
            WireMessage::ControlRevoke => handler.on_control_revoke(from).await,
            WireMessage::ControlEvent { event } => handler.on_control_event(from, event).await,
            WireMessage::PeerListUpdate { peers } => handler.on_peer_list_update(from, peers).await,
            WireMessage::RoomDestroyed => handler.on_room_destroyed(from).await,
            WireMessage::Hello {
                username,
                is_host,
                audio_enabled,
                video_enabled,
            } => {
                handler
                    .on_hello(from, username, is_host, audio_enabled, video_enabled)
                    .await
            }
            WireMessage::MediaState {
                audio_enabled,
                video_enabled,
            } => {
                handler
                    .on_media_state(from, audio_enabled, video_enabled)
                    .await
            }
            WireMessage::Unrecognized => {
                let tag = WireMessage::peek_type(payload);
                warn!(
                    "Dropping unknown message type {:?} from {}",
                    tag.as_deref().unwrap_or("<none>"),
                    from
                );
                return RouteOutcome::Unrecognized(tag);
            }
        }

        RouteOutcome::Handled(kind)
    }
}
