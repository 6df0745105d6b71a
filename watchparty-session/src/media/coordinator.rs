use crate::error::SessionError;
use crate::media::{CaptureDevices, CaptureError, PlaybackSink};
use crate::transport::{CallId, MediaCall, PeerTransport};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use watchparty_core::{
    CaptureKind, MediaStream, MediaTrack, PeerId, StreamDimensions, TrackKind,
};

/// Remote media currently playing for one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAttachment {
    pub peer: PeerId,
    pub call: CallId,
    pub stream: MediaStream,
}

/// Owns local capture tracks and every media call in both directions.
pub struct MediaStreamCoordinator {
    devices: Arc<dyn CaptureDevices>,
    playback: Arc<dyn PlaybackSink>,
    stream_id: String,
    screen: Vec<MediaTrack>,
    voice: Vec<MediaTrack>,
    capturing: HashSet<CaptureKind>,
    generations: HashMap<CaptureKind, u64>,
    outbound: HashMap<PeerId, Arc<dyn MediaCall>>,
    inbound: HashMap<PeerId, Arc<dyn MediaCall>>,
    attachments: HashMap<PeerId, StreamAttachment>,
}

impl MediaStreamCoordinator {
    pub fn new(devices: Arc<dyn CaptureDevices>, playback: Arc<dyn PlaybackSink>) -> Self {
        Self {
            devices,
            playback,
            stream_id: format!("local-{}", uuid::Uuid::new_v4().simple()),
            screen: Vec::new(),
            voice: Vec::new(),
            capturing: HashSet::new(),
            generations: HashMap::new(),
            outbound: HashMap::new(),
            inbound: HashMap::new(),
            attachments: HashMap::new(),
        }
    }

    pub fn devices(&self) -> Arc<dyn CaptureDevices> {
        self.devices.clone()
    }

    pub fn is_sharing_screen(&self) -> bool {
        !self.screen.is_empty()
    }

    pub fn is_voice_enabled(&self) -> bool {
        !self.voice.is_empty()
    }

    /// Screen and voice tracks merged into one outgoing stream.
    pub fn local_stream(&self) -> Option<MediaStream> {
        let tracks: Vec<MediaTrack> = self.screen.iter().chain(&self.voice).cloned().collect();
        (!tracks.is_empty()).then(|| MediaStream::new(self.stream_id.clone(), tracks))
    }

    /// Pixel size of the shared screen, if one is being shared.
    pub fn video_dimensions(&self) -> Option<StreamDimensions> {
        self.screen
            .iter()
            .filter(|t| t.kind == TrackKind::Video)
            .find_map(|t| t.settings)
            .map(|s| StreamDimensions::new(s.width, s.height))
    }

    pub fn attachments(&self) -> impl Iterator<Item = &StreamAttachment> {
        self.attachments.values()
    }

    pub fn generation(&self, kind: CaptureKind) -> u64 {
        self.generations.get(&kind).copied().unwrap_or(0)
    }

    /// Whether `generation` still names the live capture of `kind`.
    pub fn is_current(&self, kind: CaptureKind, generation: u64) -> bool {
        self.generation(kind) == generation && !self.tracks(kind).is_empty()
    }

    /// Reserve the device before capture runs off the event loop.
    pub fn begin_capture(&mut self, kind: CaptureKind) -> Result<(), SessionError> {
        if !self.capturing.insert(kind) {
            return Err(SessionError::invalid_state(format!(
                "{kind} capture already in progress"
            )));
        }
        Ok(())
    }

    /// Install the outcome of a capture started with
    /// [`begin_capture`](Self::begin_capture). Returns the merged local stream
    /// and the generation tag of the new capture.
    pub fn finish_capture(
        &mut self,
        kind: CaptureKind,
        result: Result<MediaStream, CaptureError>,
    ) -> Result<(MediaStream, u64), SessionError> {
        self.capturing.remove(&kind);
        let captured = result.map_err(|e| SessionError::CaptureDenied {
            kind,
            reason: e.to_string(),
        })?;

        self.release(kind);
        *self.tracks_mut(kind) = captured.tracks;
        let generation = self.bump(kind);
        info!("{} capture live (generation {})", kind, generation);

        let stream = self
            .local_stream()
            .ok_or_else(|| SessionError::invalid_state(format!("{kind} capture had no tracks")))?;
        Ok((stream, generation))
    }

    /// Release the tracks of `kind`. Returns `false` if none were live.
    pub fn stop(&mut self, kind: CaptureKind) -> bool {
        if self.tracks(kind).is_empty() {
            return false;
        }
        self.release(kind);
        self.bump(kind);
        info!("{} capture stopped", kind);
        true
    }

    pub async fn call_peer(&mut self, transport: &PeerTransport, peer: &PeerId) {
        let Some(stream) = self.local_stream() else {
            return;
        };
        if let Some(old) = self.outbound.remove(peer) {
            old.close().await;
        }
        match transport.call(peer, stream).await {
            Ok(call) => {
                debug!("Calling {} ({})", peer, call.id());
                self.outbound.insert(peer.clone(), call);
            }
            Err(e) => warn!("Media call to {} failed: {}", peer, e),
        }
    }

    /// Push the current local stream to every peer, or hang up on all of
    /// them once nothing is left to send.
    pub async fn refresh(&mut self, transport: Option<&PeerTransport>, peers: &[PeerId]) {
        match (self.local_stream(), transport) {
            (Some(_), Some(transport)) => {
                for peer in peers {
                    self.call_peer(transport, peer).await;
                }
            }
            _ => self.hang_up().await,
        }
    }

    async fn hang_up(&mut self) {
        for (peer, call) in self.outbound.drain() {
            debug!("Hanging up on {}", peer);
            call.close().await;
        }
    }

    /// Answer receive-only. A newer call from the same peer replaces the old.
    pub async fn on_incoming_call(&mut self, peer: PeerId, call: Arc<dyn MediaCall>) {
        if let Err(e) = call.answer(None).await {
            warn!("Could not answer {} from {}: {}", call.id(), peer, e);
            return;
        }
        debug!("Answered {} from {}", call.id(), peer);
        if let Some(old) = self.inbound.insert(peer, call) {
            old.close().await;
        }
    }

    /// Attach remote tracks for playback. Streams from calls that were
    /// already replaced are ignored.
    pub fn attach(&mut self, peer: PeerId, call: CallId, stream: MediaStream) -> bool {
        if self.inbound.get(&peer).map(|c| c.id()) != Some(call) {
            debug!("Ignoring stream from stale {} of {}", call, peer);
            return false;
        }
        self.playback.attach(&peer, &stream);
        self.attachments.insert(
            peer.clone(),
            StreamAttachment { peer, call, stream },
        );
        true
    }

    /// Returns `true` if this closed the attachment of `peer`.
    pub fn on_call_closed(&mut self, peer: &PeerId, call: CallId) -> bool {
        if self.outbound.get(peer).is_some_and(|c| c.id() == call) {
            self.outbound.remove(peer);
        }
        if self.inbound.get(peer).is_some_and(|c| c.id() == call) {
            self.inbound.remove(peer);
        }
        if self.attachments.get(peer).is_some_and(|a| a.call == call) {
            self.attachments.remove(peer);
            self.playback.detach(peer);
            return true;
        }
        false
    }

    /// Drop every call with `peer`. Returns `true` if an attachment went away.
    pub async fn peer_disconnected(&mut self, peer: &PeerId) -> bool {
        if let Some(call) = self.outbound.remove(peer) {
            call.close().await;
        }
        if let Some(call) = self.inbound.remove(peer) {
            call.close().await;
        }
        let detached = self.attachments.remove(peer).is_some();
        if detached {
            self.playback.detach(peer);
        }
        detached
    }

    /// Release everything: tracks, calls, attachments.
    pub async fn reset(&mut self) {
        self.stop(CaptureKind::Display);
        self.stop(CaptureKind::Microphone);
        self.hang_up().await;
        for (_, call) in self.inbound.drain() {
            call.close().await;
        }
        for peer in self.attachments.keys() {
            self.playback.detach(peer);
        }
        self.attachments.clear();
    }

    fn tracks(&self, kind: CaptureKind) -> &[MediaTrack] {
        match kind {
            CaptureKind::Display => &self.screen,
            CaptureKind::Microphone => &self.voice,
        }
    }

    fn tracks_mut(&mut self, kind: CaptureKind) -> &mut Vec<MediaTrack> {
        match kind {
            CaptureKind::Display => &mut self.screen,
            CaptureKind::Microphone => &mut self.voice,
        }
    }

    fn release(&mut self, kind: CaptureKind) {
        let tracks = std::mem::take(self.tracks_mut(kind));
        for track in &tracks {
            self.devices.release(track);
        }
    }

    fn bump(&mut self, kind: CaptureKind) -> u64 {
        let generation = self.generations.entry(kind).or_insert(0);
        *generation += 1;
        *generation
    }
}
