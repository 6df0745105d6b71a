use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::membership::{Introduction, Participant, Roster, SessionPhase};
use crate::session::SessionContext;
use crate::transport::{ConnectivityProvider, DataChannel, PeerTransport, TransportEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use watchparty_core::{PeerId, RejectReason, Room, RoomId, WireMessage};

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRoom {
    pub room_id: RoomId,
    pub local_id: PeerId,
    pub host: PeerId,
    /// Members the host announced in `join-accepted`, excluding itself.
    pub peers: Vec<PeerId>,
    pub created_at: u64,
}

pub(crate) type JoinReply = oneshot::Sender<Result<JoinedRoom, SessionError>>;

struct PendingJoin {
    room_id: RoomId,
    password: String,
    reply: JoinReply,
    deadline: Option<Instant>,
}

/// What the host decided about a `join-request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinDecision {
    Admitted { peer: PeerId, username: String },
    Rejected(RejectReason),
    /// Not hosting, already admitted, or the channel vanished meanwhile.
    Ignored,
}

/// Room lifecycle and the roster it governs.
pub struct SessionMembership {
    phase: SessionPhase,
    username: String,
    transport: Option<PeerTransport>,
    room: Option<Room>,
    roster: Roster,
    pending: Option<PendingJoin>,
    introductions: HashMap<PeerId, Introduction>,
    expires_at: Option<Instant>,
    expiry_window: Duration,
    join_timeout: Option<Duration>,
    room_id_prefix: String,
    clock: Arc<dyn Clock>,
}

impl SessionMembership {
    pub fn new(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            phase: SessionPhase::Idle,
            username: String::new(),
            transport: None,
            room: None,
            roster: Roster::default(),
            pending: None,
            introductions: HashMap::new(),
            expires_at: None,
            expiry_window: config.room_expiry(),
            join_timeout: config.join_timeout(),
            room_id_prefix: config.room_id_prefix.clone(),
            clock,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn transport(&self) -> Option<&PeerTransport> {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut PeerTransport> {
        self.transport.as_mut()
    }

    pub fn local_id(&self) -> Option<PeerId> {
        self.transport.as_ref().map(|t| t.local_id())
    }

    pub fn is_host(&self) -> bool {
        self.phase == SessionPhase::Hosting
    }

    /// The room host as seen from here: ourselves while hosting, the dialed
    /// room id while joining.
    pub fn host_id(&self) -> Option<PeerId> {
        match self.phase {
            SessionPhase::Hosting => self.local_id(),
            SessionPhase::Joining => self.pending.as_ref().map(|p| p.room_id.as_peer_id()),
            SessionPhase::Joined => self.room.as_ref().map(|r| r.host.clone()),
            SessionPhase::Idle | SessionPhase::Creating => None,
        }
    }

    pub fn is_from_host(&self, peer: &PeerId) -> bool {
        self.host_id().is_some_and(|h| h == *peer)
    }

    pub fn expiry_deadline(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn join_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().and_then(|p| p.deadline)
    }

    pub async fn create_room(
        &mut self,
        provider: &dyn ConnectivityProvider,
        events: mpsc::UnboundedSender<TransportEvent>,
        username: String,
        password: String,
    ) -> Result<Room, SessionError> {
        if self.phase != SessionPhase::Idle {
            return Err(SessionError::invalid_state(format!(
                "cannot create a room while {}",
                self.phase
            )));
        }
        self.phase = SessionPhase::Creating;

        let room_id = RoomId::generate(&self.room_id_prefix);
        let transport =
            match PeerTransport::open(provider, Some(room_id.as_peer_id()), events).await {
                Ok(t) => t,
                Err(e) => {
                    self.phase = SessionPhase::Idle;
                    return Err(e);
                }
            };

        let room = Room {
            host: transport.local_id(),
            room_id,
            password,
            created_at: self.clock.now_ms(),
        };
        info!("Room {} created by {}", room.room_id, username);

        self.transport = Some(transport);
        self.username = username;
        self.expires_at = Some(Instant::now() + self.expiry_window);
        self.room = Some(room.clone());
        self.phase = SessionPhase::Hosting;
        Ok(room)
    }

    /// Open a transport and dial the host. The outcome arrives later through
    /// `reply`; on immediate failure the error is sent there too and returned.
    pub(crate) async fn begin_join(
        &mut self,
        provider: &dyn ConnectivityProvider,
        events: mpsc::UnboundedSender<TransportEvent>,
        room_id: RoomId,
        username: String,
        password: String,
        reply: JoinReply,
    ) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Idle {
            let e = SessionError::invalid_state(format!("cannot join a room while {}", self.phase));
            let _ = reply.send(Err(e.clone()));
            return Err(e);
        }
        self.phase = SessionPhase::Joining;

        let mut transport = match PeerTransport::open(provider, None, events).await {
            Ok(t) => t,
            Err(e) => {
                self.phase = SessionPhase::Idle;
                let _ = reply.send(Err(e.clone()));
                return Err(e);
            }
        };

        info!("Joining room {} as {}", room_id, transport.local_id());
        transport.connect(&room_id.as_peer_id());

        self.transport = Some(transport);
        self.username = username;
        self.pending = Some(PendingJoin {
            room_id,
            password,
            reply,
            deadline: self.join_timeout.map(|t| Instant::now() + t),
        });
        Ok(())
    }

    /// The `join-request` to send once the channel to the host is open.
    pub fn join_request(&self) -> Option<WireMessage> {
        let pending = self.pending.as_ref()?;
        Some(WireMessage::JoinRequest {
            password: pending.password.clone(),
            username: self.username.clone(),
            peer_identity: self.local_id()?,
        })
    }

    /// Resolve the pending join with `error`. Returns `false` if nothing was
    /// pending. The caller still owns tearing the transport down.
    pub fn fail_join(&mut self, error: SessionError) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        warn!("Join of {} failed: {}", pending.room_id, error);
        let _ = pending.reply.send(Err(error));
        true
    }

    pub fn rejection_error(&self, reason: RejectReason) -> SessionError {
        match (reason, self.pending.as_ref()) {
            (RejectReason::RoomExpired, Some(p)) => SessionError::RoomExpired(p.room_id.clone()),
            _ => SessionError::AuthRejected,
        }
    }

    pub async fn handle_join_request(
        &mut self,
        ctx: &SessionContext,
        from: &PeerId,
        password: &str,
        username: String,
        peer_identity: &PeerId,
    ) -> JoinDecision {
        if self.phase != SessionPhase::Hosting {
            debug!("Ignoring join-request from {} while {}", from, self.phase);
            return JoinDecision::Ignored;
        }
        if self.roster.contains(from) {
            debug!("Duplicate join-request from admitted peer {}", from);
            return JoinDecision::Ignored;
        }
        let Some(room) = self.room.as_ref() else {
            return JoinDecision::Ignored;
        };
        if peer_identity != from {
            warn!(
                "join-request from {} claims identity {}; using the connection's",
                from, peer_identity
            );
        }

        if room.is_expired_at(self.clock.now_ms(), self.expiry_window) {
            info!("Refusing {}: room {} has expired", from, room.room_id);
            return Self::reject(ctx, from, RejectReason::RoomExpired).await;
        }
        if password != room.password {
            info!("Refusing {}: wrong password", from);
            return Self::reject(ctx, from, RejectReason::WrongPassword).await;
        }

        let Some(channel) = ctx.channel(from) else {
            return JoinDecision::Ignored;
        };

        let accepted = WireMessage::JoinAccepted {
            peers: self.roster.ids(),
            create_time: room.created_at,
        };
        if ctx.send(from, &accepted).await.is_err() {
            return JoinDecision::Ignored;
        }

        let others = self.roster.ids();
        self.admit(from.clone(), channel, Some(username.clone()));
        info!("{} ({}) admitted to {}", username, from, self.room_label());

        ctx.send_many(
            &others,
            &WireMessage::PeerListUpdate {
                peers: vec![from.clone()],
            },
        )
        .await;

        JoinDecision::Admitted {
            peer: from.clone(),
            username,
        }
    }

    async fn reject(
        ctx: &SessionContext,
        from: &PeerId,
        reason: RejectReason,
    ) -> JoinDecision {
        let _ = ctx.send(from, &WireMessage::JoinRejected { reason }).await;
        if let Some(channel) = ctx.channel(from) {
            ctx.unregister(from, channel.id());
            channel.close().await;
        }
        JoinDecision::Rejected(reason)
    }

    /// Guest side of `join-accepted`. Checks expiry against the local clock,
    /// then admits every open channel into the roster.
    pub fn accept_join(
        &mut self,
        ctx: &SessionContext,
        from: &PeerId,
        peers: Vec<PeerId>,
        create_time: u64,
    ) -> Result<JoinedRoom, SessionError> {
        if self.phase != SessionPhase::Joining || !self.is_from_host(from) {
            return Err(SessionError::invalid_state("no join is pending"));
        }
        let Some(local_id) = self.local_id() else {
            return Err(SessionError::invalid_state("transport is closed"));
        };
        let Some(pending) = self.pending.take() else {
            return Err(SessionError::invalid_state("no join is pending"));
        };

        let room = Room {
            room_id: pending.room_id,
            password: pending.password,
            created_at: create_time,
            host: from.clone(),
        };

        let now = self.clock.now_ms();
        if room.is_expired_at(now, self.expiry_window) {
            let e = SessionError::RoomExpired(room.room_id.clone());
            warn!("Room {} expired before we got in", room.room_id);
            let _ = pending.reply.send(Err(e.clone()));
            return Err(e);
        }

        self.expires_at = Some(Instant::now() + room.remaining_at(now, self.expiry_window));
        self.phase = SessionPhase::Joined;

        let peers = peers
            .into_iter()
            .filter(|p| *p != room.host && *p != local_id)
            .collect();
        let joined = JoinedRoom {
            room_id: room.room_id.clone(),
            local_id,
            host: room.host.clone(),
            peers,
            created_at: room.created_at,
        };
        self.room = Some(room);

        for peer in ctx.peers() {
            if let Some(channel) = ctx.channel(&peer) {
                self.admit(peer, channel, None);
            }
        }

        info!("Joined {} with {} peer(s)", joined.room_id, self.roster.len());
        let _ = pending.reply.send(Ok(joined.clone()));
        Ok(joined)
    }

    /// Put a peer with an open channel on the roster and return the name it
    /// goes by. `username` wins over anything an earlier `hello` said.
    pub fn admit(
        &mut self,
        peer: PeerId,
        channel: Arc<dyn DataChannel>,
        username: Option<String>,
    ) -> String {
        let intro = self.introductions.remove(&peer);
        let name = username
            .or_else(|| intro.as_ref().map(|i| i.username.clone()))
            .unwrap_or_else(|| peer.to_string());

        let mut participant = Participant::new(peer.clone(), name.clone(), channel);
        participant.is_host = self.room.as_ref().is_some_and(|r| r.host == peer);
        if let Some(intro) = intro {
            participant.audio_enabled = intro.audio_enabled;
            participant.video_enabled = intro.video_enabled;
        }

        self.roster.insert(participant);
        name
    }

    pub fn remove(&mut self, peer: &PeerId) -> Option<Participant> {
        self.introductions.remove(peer);
        self.roster.remove(peer)
    }

    /// Apply a `hello`. Peers not on the roster yet are remembered until
    /// they are admitted.
    pub fn introduce(&mut self, peer: &PeerId, intro: Introduction) -> bool {
        if self.roster.introduce(peer, &intro) {
            return true;
        }
        self.introductions.insert(peer.clone(), intro);
        false
    }

    /// Dial a mesh peer unless it is ourselves, already connected, or
    /// already being dialed.
    pub fn connect_peer(&mut self, ctx: &SessionContext, peer: &PeerId) -> bool {
        if ctx.contains(peer) {
            return false;
        }
        match self.transport.as_mut() {
            Some(t) => t.connect(peer),
            None => false,
        }
    }

    /// Drop everything room-related and return to `Idle`. A join still
    /// pending is failed with `SessionClosed`.
    pub async fn teardown(&mut self) -> Option<Room> {
        self.fail_join(SessionError::SessionClosed);
        if let Some(mut transport) = self.transport.take() {
            transport.destroy().await;
        }
        self.roster.clear();
        self.introductions.clear();
        self.expires_at = None;
        self.phase = SessionPhase::Idle;
        self.room.take()
    }

    fn room_label(&self) -> String {
        self.room
            .as_ref()
            .map(|r| r.room_id.to_string())
            .unwrap_or_default()
    }
}
