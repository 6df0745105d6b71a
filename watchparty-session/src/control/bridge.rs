use crate::control::{DispatchTarget, ReplaySurface, synthesize};
use crate::error::SessionError;
use crate::session::SessionContext;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use watchparty_core::{
    CapturedInput, InputDescriptor, NormalizedPoint, PeerId, StreamDimensions, WireMessage,
};

/// Remote-control bookkeeping for both roles.
///
/// As grantor we track who may drive our page (`granted`) and who asked
/// (`pending`). As grantee we track who lets us drive theirs (`held`) and
/// who we asked (`requested`). Per pair the state only moves
/// none -> requested -> granted -> none, or requested -> none on denial.
#[derive(Default)]
pub struct RemoteControlBridge {
    granted: BTreeMap<PeerId, StreamDimensions>,
    pending: BTreeSet<PeerId>,
    held: BTreeMap<PeerId, StreamDimensions>,
    requested: BTreeSet<PeerId>,
    last_position: Option<NormalizedPoint>,
    replayed: u64,
    ignored: u64,
}

impl RemoteControlBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn granted(&self) -> Vec<PeerId> {
        self.granted.keys().cloned().collect()
    }

    pub fn pending(&self) -> Vec<PeerId> {
        self.pending.iter().cloned().collect()
    }

    pub fn held(&self) -> Vec<PeerId> {
        self.held.keys().cloned().collect()
    }

    pub fn replayed(&self) -> u64 {
        self.replayed
    }

    pub fn ignored(&self) -> u64 {
        self.ignored
    }

    /// Ask `peer` for control. `Ok(false)` without a connection.
    pub async fn request(
        &mut self,
        ctx: &SessionContext,
        peer: &PeerId,
    ) -> Result<bool, SessionError> {
        if !ctx.contains(peer) {
            debug!("No connection to {}; control request skipped", peer);
            return Ok(false);
        }
        ctx.send(peer, &WireMessage::ControlRequest).await?;
        self.requested.insert(peer.clone());
        info!("Requested control of {}", peer);
        Ok(true)
    }

    /// Returns `true` the first time `from` asks.
    pub fn on_request(&mut self, from: &PeerId) -> bool {
        if self.granted.contains_key(from) {
            debug!("{} asked for control it already has", from);
            return false;
        }
        self.pending.insert(from.clone())
    }

    pub async fn grant(
        &mut self,
        ctx: &SessionContext,
        peer: &PeerId,
        dims: StreamDimensions,
    ) -> Result<bool, SessionError> {
        if !ctx.contains(peer) {
            debug!("No connection to {}; grant skipped", peer);
            return Ok(false);
        }
        ctx.send(
            peer,
            &WireMessage::ControlGrant {
                stream_width: dims.width,
                stream_height: dims.height,
            },
        )
        .await?;
        self.pending.remove(peer);
        self.granted.insert(peer.clone(), dims);
        info!("Granted control to {} at {}x{}", peer, dims.width, dims.height);
        Ok(true)
    }

    /// `Ok(false)` if `peer` held no grant.
    pub async fn revoke(
        &mut self,
        ctx: &SessionContext,
        peer: &PeerId,
    ) -> Result<bool, SessionError> {
        if self.granted.remove(peer).is_none() {
            return Ok(false);
        }
        info!("Revoked control from {}", peer);
        if ctx.contains(peer) {
            ctx.send(peer, &WireMessage::ControlRevoke).await?;
        }
        Ok(true)
    }

    /// Turn down a pending request. The requester hears a `control-revoke`.
    pub async fn deny(
        &mut self,
        ctx: &SessionContext,
        peer: &PeerId,
    ) -> Result<bool, SessionError> {
        if !self.pending.remove(peer) {
            return Ok(false);
        }
        info!("Denied control request from {}", peer);
        if ctx.contains(peer) {
            ctx.send(peer, &WireMessage::ControlRevoke).await?;
        }
        Ok(true)
    }

    pub fn on_grant(&mut self, from: &PeerId, dims: StreamDimensions) {
        self.requested.remove(from);
        self.held.insert(from.clone(), dims);
    }

    /// Returns `true` if this ended a grant or an outstanding request.
    pub fn on_revoke(&mut self, from: &PeerId) -> bool {
        let held = self.held.remove(from).is_some();
        let requested = self.requested.remove(from);
        held || requested
    }

    /// Scale `input` for every grantor and send it. Returns how many
    /// grantors it reached.
    pub async fn forward(&mut self, ctx: &SessionContext, input: &CapturedInput) -> usize {
        if let Some(position) = input.position {
            self.last_position = Some(position);
        }
        let fallback = self.last_position.unwrap_or(NormalizedPoint::CENTER);

        let mut delivered = 0;
        let grantors: Vec<_> = self.held.iter().map(|(p, d)| (p.clone(), *d)).collect();
        for (grantor, dims) in grantors {
            let event = input.to_descriptor(dims, fallback);
            match ctx.send(&grantor, &WireMessage::ControlEvent { event }).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Could not forward input to {}: {}", grantor, e),
            }
        }
        delivered
    }

    /// Inject an event from `from` if it holds a grant. Events from anyone
    /// else are counted and dropped.
    pub fn replay(
        &mut self,
        surface: &dyn ReplaySurface,
        from: &PeerId,
        descriptor: &InputDescriptor,
    ) -> bool {
        let Some(dims) = self.granted.get(from).copied() else {
            self.ignored += 1;
            debug!("Ignoring control-event from {} without a grant", from);
            return false;
        };

        let event = synthesize(descriptor, dims, surface.viewport());
        let target = surface
            .element_at(event.client_x, event.client_y)
            .map(DispatchTarget::Element)
            .unwrap_or(DispatchTarget::DocumentRoot);
        surface.dispatch(target, event);
        self.replayed += 1;
        true
    }

    /// Forget every relation with `peer`.
    pub fn peer_disconnected(&mut self, peer: &PeerId) {
        self.granted.remove(peer);
        self.pending.remove(peer);
        self.held.remove(peer);
        self.requested.remove(peer);
    }

    pub fn reset(&mut self) {
        self.granted.clear();
        self.pending.clear();
        self.held.clear();
        self.requested.clear();
        self.last_position = None;
    }
}
