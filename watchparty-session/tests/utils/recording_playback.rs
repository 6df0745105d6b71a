use dashmap::DashMap;
use std::sync::Arc;
use watchparty_core::{MediaStream, PeerId};
use watchparty_session::PlaybackSink;

/// Tracks which remote streams are currently attached to playback.
#[derive(Clone, Default)]
pub struct RecordingPlayback {
    attached: Arc<DashMap<PeerId, MediaStream>>,
}

impl RecordingPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream_of(&self, peer: &PeerId) -> Option<MediaStream> {
        self.attached.get(peer).map(|s| s.value().clone())
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }
}

impl PlaybackSink for RecordingPlayback {
    fn attach(&self, peer: &PeerId, stream: &MediaStream) {
        self.attached.insert(peer.clone(), stream.clone());
    }

    fn detach(&self, peer: &PeerId) {
        self.attached.remove(peer);
    }
}
