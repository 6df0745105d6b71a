use watchparty_core::{MediaStream, PeerId};

/// Where remote media ends up. Each peer has at most one attached stream.
pub trait PlaybackSink: Send + Sync + 'static {
    fn attach(&self, peer: &PeerId, stream: &MediaStream);

    fn detach(&self, peer: &PeerId);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlayback;

impl PlaybackSink for NullPlayback {
    fn attach(&self, _peer: &PeerId, _stream: &MediaStream) {}

    fn detach(&self, _peer: &PeerId) {}
}
