use async_trait::async_trait;
use tracing::debug;
use watchparty_core::{InputDescriptor, PeerId, RejectReason};

/// One method per wire message type. The router calls exactly one of these
/// per decoded payload; authority checks are the implementor's job.
///
/// Every method defaults to ignoring the message.
#[async_trait]
pub trait MessageHandler: Send {
    async fn on_join_request(
        &mut self,
        from: PeerId,
        password: String,
        username: String,
        peer_identity: PeerId,
    ) {
        let _ = (password, username, peer_identity);
        debug!("Unhandled join-request from {}", from);
    }

    async fn on_join_accepted(&mut self, from: PeerId, peers: Vec<PeerId>, create_time: u64) {
        let _ = (peers, create_time);
        debug!("Unhandled join-accepted from {}", from);
    }

    async fn on_join_rejected(&mut self, from: PeerId, reason: RejectReason) {
        debug!("Unhandled join-rejected ({:?}) from {}", reason, from);
    }

    async fn on_chat(
        &mut self,
        from: PeerId,
        id: Option<String>,
        sender: String,
        text: String,
        timestamp: Option<u64>,
    ) {
        let _ = (id, sender, text, timestamp);
        debug!("Unhandled chat from {}", from);
    }

    async fn on_control_request(&mut self, from: PeerId) {
        debug!("Unhandled control-request from {}", from);
    }

    async fn on_control_grant(&mut self, from: PeerId, stream_width: u32, stream_height: u32) {
        let _ = (stream_width, stream_height);
        debug!("Unhandled control-grant from {}", from);
    }

    async fn on_control_revoke(&mut self, from: PeerId) {
        debug!("Unhandled control-revoke from {}", from);
    }

    async fn on_control_event(&mut self, from: PeerId, event: InputDescriptor) {
        let _ = event;
        debug!("Unhandled control-event from {}", from);
    }

    async fn on_peer_list_update(&mut self, from: PeerId, peers: Vec<PeerId>) {
        let _ = peers;
        debug!("Unhandled peer-list-update from {}", from);
    }

    async fn on_room_destroyed(&mut self, from: PeerId) {
        debug!("Unhandled room-destroyed from {}", from);
    }

    async fn on_hello(
        &mut self,
        from: PeerId,
        username: String,
        is_host: bool,
        audio_enabled: bool,
        video_enabled: bool,
    ) {
        let _ = (username, is_host, audio_enabled, video_enabled);
        debug!("Unhandled hello from {}", from);
    }

    async fn on_media_state(&mut self, from: PeerId, audio_enabled: bool, video_enabled: bool) {
        let _ = (audio_enabled, video_enabled);
        debug!("Unhandled media-state from {}", from);
    }
}
