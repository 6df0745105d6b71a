use crate::chat::ChatLog;
use crate::config::SessionConfig;
use crate::control::RemoteControlBridge;
use crate::error::SessionError;
use crate::media::{CaptureError, CapturedStream, MediaStreamCoordinator};
use crate::membership::{Introduction, JoinDecision, JoinReply, SessionMembership, SessionPhase};
use crate::router::{MessageHandler, MessageRouter, RouterStats};
use crate::session::{
    ParticipantInfo, Reply, SessionCommand, SessionContext, SessionEnvironment, SessionHandle,
    SessionNotice, SessionSnapshot,
};
use crate::transport::{ChannelId, DataChannel, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;
use watchparty_core::{
    CaptureKind, ChatMessage, InputDescriptor, MediaStream, PeerId, RejectReason, Room, RoomId,
    StreamDimensions, WireMessage,
};

enum ChannelInstall {
    New,
    Replaced,
    Discarded,
}

/// One participant's view of a watch party, run as a single task.
///
/// All state lives here and is only touched from [`Session::run`], so a
/// handler always sees the roster and the channel table in agreement.
pub struct Session {
    env: SessionEnvironment,
    ctx: SessionContext,
    membership: SessionMembership,
    media: MediaStreamCoordinator,
    control: RemoteControlBridge,
    chat: ChatLog,
    stats: RouterStats,
    command_rx: mpsc::Receiver<SessionCommand>,
    command_tx: mpsc::WeakSender<SessionCommand>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl Session {
    /// Start a session task and return the handle that drives it. The task
    /// stops on [`SessionHandle::shutdown`] or once every handle is dropped.
    pub fn spawn(config: SessionConfig, env: SessionEnvironment) -> SessionHandle {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let session = Session::new(&config, env, rx, tx.downgrade());

        tokio::spawn(async move {
            session.run().await;
        });

        SessionHandle::new(tx)
    }

    fn new(
        config: &SessionConfig,
        env: SessionEnvironment,
        command_rx: mpsc::Receiver<SessionCommand>,
        command_tx: mpsc::WeakSender<SessionCommand>,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();

        Self {
            membership: SessionMembership::new(config, env.clock.clone()),
            media: MediaStreamCoordinator::new(env.devices.clone(), env.playback.clone()),
            ctx: SessionContext::new(),
            control: RemoteControlBridge::new(),
            chat: ChatLog::default(),
            stats: RouterStats::default(),
            env,
            command_rx,
            command_tx,
            transport_rx,
            transport_tx,
        }
    }

    async fn run(mut self) {
        info!("Session event loop started");

        loop {
            let expiry = self.membership.expiry_deadline();
            let join_deadline = self.membership.join_deadline();

            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => {
                            if self.handle_command(c).await.is_break() {
                                break;
                            }
                        }
                        None => {
                            info!("All session handles dropped. Shutting down session.");
                            self.close_room().await;
                            break;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_transport_event(e).await,
                        None => {
                            warn!("Transport channel closed unexpectedly");
                            break;
                        }
                    }
                }

                _ = sleep_until(expiry) => self.on_room_expired().await,

                _ = sleep_until(join_deadline) => self.on_join_timeout().await,
            }
        }

        info!("Session event loop finished");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> ControlFlow<()> {
        match cmd {
            SessionCommand::CreateRoom {
                username,
                password,
                reply,
            } => {
                let result = self.create_room(username, password).await;
                let _ = reply.send(result);
            }

            SessionCommand::JoinRoom {
                room_id,
                username,
                password,
                reply,
            } => self.join_room(room_id, username, password, reply).await,

            SessionCommand::DestroyRoom { reply } => {
                self.destroy_room().await;
                let _ = reply.send(Ok(()));
            }

            SessionCommand::LeaveRoom { reply } => {
                self.leave_room().await;
                let _ = reply.send(Ok(()));
            }

            SessionCommand::SendChat { text, reply } => {
                let _ = reply.send(self.send_chat(text).await);
            }

            SessionCommand::RequestControl { peer, reply } => {
                let result = if self.membership.roster().contains(&peer) {
                    self.control.request(&self.ctx, &peer).await
                } else {
                    Ok(false)
                };
                let _ = reply.send(result);
            }

            SessionCommand::GrantControl { peer, reply } => {
                let _ = reply.send(self.grant_control(&peer).await);
            }

            SessionCommand::RevokeControl { peer, reply } => {
                let result = self.control.revoke(&self.ctx, &peer).await;
                let _ = reply.send(result);
            }

            SessionCommand::DenyControl { peer, reply } => {
                let result = self.control.deny(&self.ctx, &peer).await;
                let _ = reply.send(result);
            }

            SessionCommand::ForwardInput { input, reply } => {
                let delivered = self.control.forward(&self.ctx, &input).await;
                let _ = reply.send(Ok(delivered));
            }

            SessionCommand::StartCapture { kind, reply } => self.start_capture(kind, reply),

            SessionCommand::StopCapture { kind, reply } => {
                let stopped = self.stop_capture(kind).await;
                let _ = reply.send(Ok(stopped));
            }

            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }

            SessionCommand::Shutdown { reply } => {
                info!("Shutdown requested");
                self.close_room().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }

            SessionCommand::CaptureFinished {
                kind,
                result,
                reply,
            } => self.capture_finished(kind, result, reply).await,

            SessionCommand::CaptureEnded { kind, generation } => {
                self.capture_ended(kind, generation).await
            }
        }

        ControlFlow::Continue(())
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ChannelOpened {
                peer,
                channel,
                initiated_locally,
            } => self.on_channel_opened(peer, channel, initiated_locally).await,

            TransportEvent::ConnectFailed { peer, reason } => {
                self.on_connect_failed(peer, reason).await
            }

            TransportEvent::Message { peer, data, .. } => self.on_message(peer, data).await,

            TransportEvent::ChannelClosed { peer, channel } => {
                self.on_channel_closed(peer, channel).await
            }

            TransportEvent::IncomingCall { peer, call } => {
                if self.membership.roster().contains(&peer) {
                    self.media.on_incoming_call(peer, call).await;
                } else {
                    debug!("Refusing call from non-member {}", peer);
                    call.close().await;
                }
            }

            TransportEvent::RemoteStream { peer, call, stream } => {
                if self.media.attach(peer.clone(), call, stream) {
                    self.notify(SessionNotice::RemoteStreamAttached { peer }).await;
                }
            }

            TransportEvent::CallClosed { peer, call } => {
                if self.media.on_call_closed(&peer, call) {
                    self.notify(SessionNotice::RemoteStreamDetached { peer }).await;
                }
            }
        }
    }

    async fn create_room(
        &mut self,
        username: String,
        password: String,
    ) -> Result<Room, SessionError> {
        let room = self
            .membership
            .create_room(
                self.env.provider.as_ref(),
                self.transport_tx.clone(),
                username,
                password,
            )
            .await?;

        self.chat.clear();
        self.notify(SessionNotice::RoomCreated {
            room_id: room.room_id.clone(),
        })
        .await;
        Ok(room)
    }

    async fn join_room(
        &mut self,
        room_id: RoomId,
        username: String,
        password: String,
        reply: JoinReply,
    ) {
        if self.membership.phase() == SessionPhase::Idle {
            self.chat.clear();
        }

        let started = self
            .membership
            .begin_join(
                self.env.provider.as_ref(),
                self.transport_tx.clone(),
                room_id,
                username,
                password,
                reply,
            )
            .await;

        if let Err(error) = started
            && !matches!(error, SessionError::InvalidState(_))
        {
            self.notify(SessionNotice::JoinFailed { error }).await;
        }
    }

    /// Tell everyone the room is gone, then drop it. No-op unless hosting.
    async fn destroy_room(&mut self) {
        if self.membership.phase() != SessionPhase::Hosting {
            debug!("destroy_room while {}; nothing to do", self.membership.phase());
            return;
        }

        let notified = self.ctx.broadcast(&WireMessage::RoomDestroyed).await;
        info!("Destroying room, notified {} connection(s)", notified);

        if let Some(room) = self.teardown().await {
            self.notify(SessionNotice::RoomDestroyed {
                room_id: room.room_id,
            })
            .await;
        }
    }

    async fn leave_room(&mut self) {
        match self.membership.phase() {
            SessionPhase::Joining => {
                self.abort_join(SessionError::invalid_state(
                    "left before the host answered",
                ))
                .await;
            }
            SessionPhase::Joined => {
                if let Some(room) = self.teardown().await {
                    info!("Left room {}", room.room_id);
                }
            }
            phase => debug!("leave_room while {}; nothing to do", phase),
        }
    }

    async fn close_room(&mut self) {
        match self.membership.phase() {
            SessionPhase::Hosting => self.destroy_room().await,
            SessionPhase::Joining | SessionPhase::Joined => self.leave_room().await,
            SessionPhase::Idle | SessionPhase::Creating => {}
        }
    }

    async fn abort_join(&mut self, error: SessionError) {
        self.membership.fail_join(error.clone());
        self.teardown().await;
        self.notify(SessionNotice::JoinFailed { error }).await;
    }

    /// Close every channel, release media, drop grants and the transport.
    async fn teardown(&mut self) -> Option<Room> {
        for channel in self.ctx.drain() {
            channel.close().await;
        }
        self.control.reset();
        self.media.reset().await;
        self.membership.teardown().await
    }

    async fn on_room_expired(&mut self) {
        let Some(room_id) = self.membership.room().map(|r| r.room_id.clone()) else {
            return;
        };
        info!("Room {} reached its expiry", room_id);

        match self.membership.phase() {
            SessionPhase::Hosting => self.destroy_room().await,
            SessionPhase::Joined => {
                self.teardown().await;
            }
            _ => return,
        }
        self.notify(SessionNotice::RoomExpired { room_id }).await;
    }

    async fn on_join_timeout(&mut self) {
        let Some(host) = self.membership.host_id() else {
            return;
        };
        if self.membership.phase() != SessionPhase::Joining {
            return;
        }
        self.abort_join(SessionError::connect_failed(
            &host,
            "timed out waiting for the host",
        ))
        .await;
    }

    async fn on_channel_opened(
        &mut self,
        peer: PeerId,
        channel: Arc<dyn DataChannel>,
        initiated_locally: bool,
    ) {
        if initiated_locally && let Some(transport) = self.membership.transport_mut() {
            transport.dial_finished(&peer);
        }

        let phase = self.membership.phase();
        if !matches!(
            phase,
            SessionPhase::Hosting | SessionPhase::Joining | SessionPhase::Joined
        ) {
            debug!("Closing {} from {} while {}", channel.id(), peer, phase);
            channel.close().await;
            return;
        }

        match self.install_channel(&peer, channel, initiated_locally).await {
            ChannelInstall::New => {}
            ChannelInstall::Replaced => {
                if self.membership.roster().contains(&peer) {
                    self.send_hello(&peer).await;
                }
                return;
            }
            ChannelInstall::Discarded => return,
        }

        match phase {
            SessionPhase::Hosting => debug!("{} connected, awaiting join-request", peer),
            SessionPhase::Joining if self.membership.is_from_host(&peer) => {
                if let Some(request) = self.membership.join_request() {
                    info!("Connected to host {}, sending join-request", peer);
                    let _ = self.ctx.send(&peer, &request).await;
                }
            }
            SessionPhase::Joining => debug!("Early mesh connection from {}", peer),
            SessionPhase::Joined => {
                if let Some(channel) = self.ctx.channel(&peer) {
                    let username = self.membership.admit(peer.clone(), channel, None);
                    self.after_admission(&peer, username).await;
                }
            }
            SessionPhase::Idle | SessionPhase::Creating => {}
        }
    }

    /// Register `channel` unless `peer` already has one. Two channels to
    /// the same peer keep the one dialed by the smaller identity, so both
    /// ends settle on the same channel.
    async fn install_channel(
        &mut self,
        peer: &PeerId,
        channel: Arc<dyn DataChannel>,
        initiated_locally: bool,
    ) -> ChannelInstall {
        let Some(existing) = self.ctx.channel(peer) else {
            self.ctx.register(peer.clone(), channel);
            return ChannelInstall::New;
        };
        if existing.id() == channel.id() {
            return ChannelInstall::Discarded;
        }
        let Some(local) = self.membership.local_id() else {
            channel.close().await;
            return ChannelInstall::Discarded;
        };

        let dialer = if initiated_locally { &local } else { peer };
        if dialer == std::cmp::min(&local, peer) {
            info!(
                "Replacing {} with {} for {}",
                existing.id(),
                channel.id(),
                peer
            );
            self.ctx.register(peer.clone(), channel.clone());
            if let Some(p) = self.membership.roster_mut().get_mut(peer) {
                p.connection = channel;
            }
            existing.close().await;
            ChannelInstall::Replaced
        } else {
            debug!("Dropping duplicate {} from {}", channel.id(), peer);
            channel.close().await;
            ChannelInstall::Discarded
        }
    }

    async fn after_admission(&mut self, peer: &PeerId, username: String) {
        self.send_hello(peer).await;
        if let Some(transport) = self.membership.transport() {
            self.media.call_peer(transport, peer).await;
        }
        self.notify(SessionNotice::ParticipantJoined {
            peer: peer.clone(),
            username,
        })
        .await;
    }

    async fn on_connect_failed(&mut self, peer: PeerId, reason: String) {
        let in_flight = self
            .membership
            .transport_mut()
            .is_some_and(|t| t.dial_finished(&peer));
        let phase = self.membership.phase();
        if !in_flight || !(phase.in_room() || phase == SessionPhase::Joining) {
            debug!("Ignoring failed dial to {} from an earlier room", peer);
            return;
        }

        if phase == SessionPhase::Joining && self.membership.is_from_host(&peer)
        {
            self.abort_join(SessionError::connect_failed(&peer, reason))
                .await;
            return;
        }

        warn!("Could not reach {}: {}", peer, reason);
        self.notify(SessionNotice::PeerUnreachable { peer, reason })
            .await;
    }

    async fn on_message(&mut self, peer: PeerId, data: Bytes) {
        if !self.ctx.contains(&peer) {
            debug!("Dropping message from unconnected {}", peer);
            return;
        }
        let outcome = MessageRouter::dispatch(&mut *self, peer, &data).await;
        self.stats.record(&outcome);
    }

    async fn on_channel_closed(&mut self, peer: PeerId, channel: ChannelId) {
        if !self.ctx.unregister(&peer, channel) {
            debug!("Ignoring close of stale {} from {}", channel, peer);
            return;
        }

        if self.membership.phase() == SessionPhase::Joining && self.membership.is_from_host(&peer)
        {
            self.abort_join(SessionError::connect_failed(
                &peer,
                "host closed the connection",
            ))
            .await;
            return;
        }

        self.control.peer_disconnected(&peer);
        if self.media.peer_disconnected(&peer).await {
            self.notify(SessionNotice::RemoteStreamDetached { peer: peer.clone() })
                .await;
        }
        if self.membership.remove(&peer).is_some() {
            info!("{} left the room", peer);
            self.notify(SessionNotice::ParticipantLeft { peer }).await;
        }
    }

    async fn send_hello(&self, peer: &PeerId) {
        let hello = WireMessage::Hello {
            username: self.membership.username().to_owned(),
            is_host: self.membership.is_host(),
            audio_enabled: self.media.is_voice_enabled(),
            video_enabled: self.media.is_sharing_screen(),
        };
        let _ = self.ctx.send(peer, &hello).await;
    }

    fn is_member(&self, peer: &PeerId, kind: &str) -> bool {
        if self.membership.roster().contains(peer) {
            return true;
        }
        debug!("Ignoring {} from non-member {}", kind, peer);
        false
    }

    async fn send_chat(&mut self, text: String) -> Result<ChatMessage, SessionError> {
        if !self.membership.phase().in_room() {
            return Err(SessionError::invalid_state("not in a room"));
        }

        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            sender: self.membership.username().to_owned(),
            text,
            timestamp: self.env.clock.now_ms(),
            is_host: self.membership.is_host(),
        };

        let peers = self.membership.roster().ids();
        self.ctx
            .send_many(
                &peers,
                &WireMessage::Chat {
                    id: Some(message.id.clone()),
                    sender: message.sender.clone(),
                    text: message.text.clone(),
                    timestamp: Some(message.timestamp),
                },
            )
            .await;

        self.chat.push(message.clone());
        Ok(message)
    }

    async fn grant_control(
        &mut self,
        peer: &PeerId,
    ) -> Result<Option<StreamDimensions>, SessionError> {
        if !self.membership.roster().contains(peer) {
            return Ok(None);
        }
        let dims = self
            .media
            .video_dimensions()
            .unwrap_or_else(|| self.env.surface.viewport().to_dimensions());

        let sent = self.control.grant(&self.ctx, peer, dims).await?;
        Ok(sent.then_some(dims))
    }

    fn start_capture(&mut self, kind: CaptureKind, reply: Reply<MediaStream>) {
        if !self.membership.phase().in_room() {
            let _ = reply.send(Err(SessionError::invalid_state("not in a room")));
            return;
        }

        let active = match kind {
            CaptureKind::Display => self.media.is_sharing_screen(),
            CaptureKind::Microphone => self.media.is_voice_enabled(),
        };
        if active && let Some(stream) = self.media.local_stream() {
            let _ = reply.send(Ok(stream));
            return;
        }

        let Some(tx) = self.command_tx.upgrade() else {
            let _ = reply.send(Err(SessionError::SessionClosed));
            return;
        };
        if let Err(e) = self.media.begin_capture(kind) {
            let _ = reply.send(Err(e));
            return;
        }

        let devices = self.media.devices();
        tokio::spawn(async move {
            let result = match kind {
                CaptureKind::Display => devices.capture_display().await,
                CaptureKind::Microphone => devices.capture_microphone().await,
            };
            let _ = tx
                .send(SessionCommand::CaptureFinished {
                    kind,
                    result,
                    reply,
                })
                .await;
        });
    }

    async fn capture_finished(
        &mut self,
        kind: CaptureKind,
        result: Result<CapturedStream, CaptureError>,
        reply: Reply<MediaStream>,
    ) {
        let (result, ended) = match result {
            Ok(captured) => (Ok(captured.stream), captured.ended),
            Err(e) => (Err(e), None),
        };

        let (stream, generation) = match self.media.finish_capture(kind, result) {
            Ok(installed) => installed,
            Err(error) => {
                if let SessionError::CaptureDenied { kind, reason } = &error {
                    self.notify(SessionNotice::CaptureDenied {
                        kind: *kind,
                        reason: reason.clone(),
                    })
                    .await;
                }
                let _ = reply.send(Err(error));
                return;
            }
        };

        if !self.membership.phase().in_room() {
            self.media.stop(kind);
            let _ = reply.send(Err(SessionError::invalid_state(
                "room closed while capturing",
            )));
            return;
        }

        if let Some(ended) = ended {
            self.watch_capture_end(kind, generation, ended);
        }
        self.push_local_media().await;
        let _ = reply.send(Ok(stream));
    }

    fn watch_capture_end(&self, kind: CaptureKind, generation: u64, ended: oneshot::Receiver<()>) {
        let tx = self.command_tx.clone();
        tokio::spawn(async move {
            // A dropped sender means the track was released by us, not the OS.
            if ended.await.is_err() {
                return;
            }
            if let Some(tx) = tx.upgrade() {
                let _ = tx
                    .send(SessionCommand::CaptureEnded { kind, generation })
                    .await;
            }
        });
    }

    async fn capture_ended(&mut self, kind: CaptureKind, generation: u64) {
        if !self.media.is_current(kind, generation) {
            return;
        }
        info!("{} capture ended by the system", kind);
        self.media.stop(kind);
        self.push_local_media().await;
        if kind == CaptureKind::Display {
            self.notify(SessionNotice::ScreenShareEnded).await;
        }
    }

    async fn stop_capture(&mut self, kind: CaptureKind) -> bool {
        if !self.media.stop(kind) {
            return false;
        }
        self.push_local_media().await;
        true
    }

    /// Re-call every member with the current local stream and announce the
    /// new media flags.
    async fn push_local_media(&mut self) {
        let peers = self.membership.roster().ids();
        self.media
            .refresh(self.membership.transport(), &peers)
            .await;

        let state = WireMessage::MediaState {
            audio_enabled: self.media.is_voice_enabled(),
            video_enabled: self.media.is_sharing_screen(),
        };
        self.ctx.send_many(&peers, &state).await;
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.membership.phase(),
            local_id: self.membership.local_id(),
            room: self.membership.room().cloned(),
            participants: self
                .membership
                .roster()
                .iter()
                .map(|p| ParticipantInfo {
                    identity: p.identity.clone(),
                    username: p.username.clone(),
                    is_host: p.is_host,
                    audio_enabled: p.audio_enabled,
                    video_enabled: p.video_enabled,
                })
                .collect(),
            open_connections: self.ctx.len(),
            connecting: self
                .membership
                .transport()
                .map(|t| t.dialing())
                .unwrap_or_default(),
            chat: self.chat.entries().to_vec(),
            pending_control_requests: self.control.pending(),
            granted_control: self.control.granted(),
            held_control: self.control.held(),
            sharing_screen: self.media.is_sharing_screen(),
            voice_enabled: self.media.is_voice_enabled(),
            remote_streams: self.media.attachments().map(|a| a.peer.clone()).collect(),
            replayed_events: self.control.replayed(),
            ignored_events: self.control.ignored(),
            dropped_messages: self.stats.dropped,
        }
    }

    async fn notify(&self, notice: SessionNotice) {
        self.env.observer.on_notice(notice).await;
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl MessageHandler for Session {
    async fn on_join_request(
        &mut self,
        from: PeerId,
        password: String,
        username: String,
        peer_identity: PeerId,
    ) {
        let decision = self
            .membership
            .handle_join_request(&self.ctx, &from, &password, username, &peer_identity)
            .await;

        match decision {
            JoinDecision::Admitted { peer, username } => {
                self.after_admission(&peer, username).await
            }
            JoinDecision::Rejected(reason) => debug!("Rejected {} ({:?})", from, reason),
            JoinDecision::Ignored => {}
        }
    }

    async fn on_join_accepted(&mut self, from: PeerId, peers: Vec<PeerId>, create_time: u64) {
        if self.membership.phase() != SessionPhase::Joining || !self.membership.is_from_host(&from)
        {
            warn!("Ignoring join-accepted from {}", from);
            return;
        }

        let joined = match self
            .membership
            .accept_join(&self.ctx, &from, peers, create_time)
        {
            Ok(joined) => joined,
            Err(error) => {
                self.teardown().await;
                self.notify(SessionNotice::JoinFailed { error }).await;
                return;
            }
        };

        self.notify(SessionNotice::Joined {
            room_id: joined.room_id.clone(),
        })
        .await;

        let members: Vec<(PeerId, String)> = self
            .membership
            .roster()
            .iter()
            .map(|p| (p.identity.clone(), p.username.clone()))
            .collect();
        for (peer, username) in members {
            self.after_admission(&peer, username).await;
        }

        for peer in &joined.peers {
            self.membership.connect_peer(&self.ctx, peer);
        }
    }

    async fn on_join_rejected(&mut self, from: PeerId, reason: RejectReason) {
        if self.membership.phase() != SessionPhase::Joining || !self.membership.is_from_host(&from)
        {
            warn!("Ignoring join-rejected from {}", from);
            return;
        }
        let error = self.membership.rejection_error(reason);
        self.abort_join(error).await;
    }

    async fn on_chat(
        &mut self,
        from: PeerId,
        id: Option<String>,
        sender: String,
        text: String,
        timestamp: Option<u64>,
    ) {
        let Some(is_host) = self.membership.roster().get(&from).map(|p| p.is_host) else {
            debug!("Ignoring chat from non-member {}", from);
            return;
        };

        let message = ChatMessage {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            sender,
            text,
            timestamp: timestamp.unwrap_or_else(|| self.env.clock.now_ms()),
            is_host,
        };
        self.chat.push(message.clone());
        self.notify(SessionNotice::ChatReceived(message)).await;
    }

    async fn on_control_request(&mut self, from: PeerId) {
        if self.is_member(&from, "control-request") && self.control.on_request(&from) {
            info!("{} requests control", from);
            self.notify(SessionNotice::ControlRequested { peer: from })
                .await;
        }
    }

    async fn on_control_grant(&mut self, from: PeerId, stream_width: u32, stream_height: u32) {
        if !self.is_member(&from, "control-grant") {
            return;
        }
        let dims = StreamDimensions::new(stream_width, stream_height);
        info!("{} granted us control ({}x{})", from, dims.width, dims.height);
        self.control.on_grant(&from, dims);
        self.notify(SessionNotice::ControlGranted { by: from, dims })
            .await;
    }

    async fn on_control_revoke(&mut self, from: PeerId) {
        if self.is_member(&from, "control-revoke") && self.control.on_revoke(&from) {
            info!("{} revoked our control", from);
            self.notify(SessionNotice::ControlRevoked { by: from }).await;
        }
    }

    async fn on_control_event(&mut self, from: PeerId, event: InputDescriptor) {
        self.control
            .replay(self.env.surface.as_ref(), &from, &event);
    }

    async fn on_peer_list_update(&mut self, from: PeerId, peers: Vec<PeerId>) {
        let phase = self.membership.phase();
        if !matches!(phase, SessionPhase::Joining | SessionPhase::Joined)
            || !self.membership.is_from_host(&from)
        {
            warn!("Ignoring peer-list-update from {}", from);
            return;
        }
        for peer in &peers {
            if self.membership.connect_peer(&self.ctx, peer) {
                debug!("Dialing announced peer {}", peer);
            }
        }
    }

    async fn on_room_destroyed(&mut self, from: PeerId) {
        if !self.membership.is_from_host(&from) {
            warn!("Ignoring room-destroyed from {}", from);
            return;
        }

        match self.membership.phase() {
            SessionPhase::Joining => {
                self.abort_join(SessionError::connect_failed(&from, "room was closed"))
                    .await;
            }
            SessionPhase::Joined => {
                info!("Host closed the room");
                if let Some(room) = self.teardown().await {
                    self.notify(SessionNotice::RoomDestroyed {
                        room_id: room.room_id,
                    })
                    .await;
                }
            }
            _ => {}
        }
    }

    async fn on_hello(
        &mut self,
        from: PeerId,
        username: String,
        is_host: bool,
        audio_enabled: bool,
        video_enabled: bool,
    ) {
        if self.membership.is_host() && !self.is_member(&from, "hello") {
            return;
        }
        let intro = Introduction {
            username,
            is_host,
            audio_enabled,
            video_enabled,
        };
        if !self.membership.introduce(&from, intro) {
            debug!("Holding hello from {} until admission", from);
        }
    }

    async fn on_media_state(&mut self, from: PeerId, audio_enabled: bool, video_enabled: bool) {
        match self.membership.roster_mut().get_mut(&from) {
            Some(p) => {
                p.audio_enabled = audio_enabled;
                p.video_enabled = video_enabled;
            }
            None => debug!("Ignoring media-state from non-member {}", from),
        }
    }
}
