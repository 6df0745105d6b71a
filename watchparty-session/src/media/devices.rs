use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;
use watchparty_core::{
    MediaStream, MediaTrack, StreamDimensions, TrackKind, TrackSettings,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The user or OS declined the permission prompt.
    #[error("permission denied: {0}")]
    Denied(String),

    #[error("no capture device: {0}")]
    Unavailable(String),
}

/// A freshly captured local stream.
pub struct CapturedStream {
    pub stream: MediaStream,
    /// Resolves when the OS ends the capture on its own, e.g. the user hit
    /// the system "stop sharing" button.
    pub ended: Option<oneshot::Receiver<()>>,
}

/// Access to local capture hardware.
#[async_trait]
pub trait CaptureDevices: Send + Sync + 'static {
    async fn capture_display(&self) -> Result<CapturedStream, CaptureError>;

    async fn capture_microphone(&self) -> Result<CapturedStream, CaptureError>;

    /// Stop a track and give the device back.
    fn release(&self, track: &MediaTrack);
}

/// Headless devices producing synthetic tracks.
pub struct StaticDevices {
    display: StreamDimensions,
    deny_display: AtomicBool,
    deny_microphone: AtomicBool,
    next_id: AtomicU64,
    live: DashSet<String>,
    enders: DashMap<String, oneshot::Sender<()>>,
}

impl StaticDevices {
    pub fn new(display: StreamDimensions) -> Self {
        Self {
            display,
            deny_display: AtomicBool::new(false),
            deny_microphone: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            live: DashSet::new(),
            enders: DashMap::new(),
        }
    }

    /// Devices that refuse every capture.
    pub fn denied() -> Self {
        let devices = Self::new(StreamDimensions::new(1920, 1080));
        devices.set_display_denied(true);
        devices.set_microphone_denied(true);
        devices
    }

    pub fn set_display_denied(&self, denied: bool) {
        self.deny_display.store(denied, Ordering::SeqCst);
    }

    pub fn set_microphone_denied(&self, denied: bool) {
        self.deny_microphone.store(denied, Ordering::SeqCst);
    }

    /// Act like the OS "stop sharing" button for every live display capture.
    pub fn end_display(&self) -> usize {
        let ids: Vec<String> = self.enders.iter().map(|e| e.key().clone()).collect();
        ids.iter()
            .filter_map(|id| self.enders.remove(id))
            .filter(|(_, tx)| !tx.is_closed())
            .map(|(_, tx)| tx.send(()))
            .filter(Result::is_ok)
            .count()
    }

    /// Tracks captured and not yet released.
    pub fn live_tracks(&self) -> usize {
        self.live.len()
    }

    fn track(&self, kind: TrackKind, label: &str, settings: Option<TrackSettings>) -> MediaTrack {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let track = MediaTrack {
            id: format!("{label}-{n}"),
            kind,
            label: label.to_owned(),
            settings,
        };
        self.live.insert(track.id.clone());
        track
    }
}

impl Default for StaticDevices {
    fn default() -> Self {
        Self::new(StreamDimensions::new(1920, 1080))
    }
}

#[async_trait]
impl CaptureDevices for StaticDevices {
    async fn capture_display(&self) -> Result<CapturedStream, CaptureError> {
        if self.deny_display.load(Ordering::SeqCst) {
            return Err(CaptureError::Denied("screen capture was declined".to_owned()));
        }
        let track = self.track(
            TrackKind::Video,
            "screen",
            Some(TrackSettings {
                width: self.display.width,
                height: self.display.height,
            }),
        );
        let (tx, rx) = oneshot::channel();
        self.enders.insert(track.id.clone(), tx);
        debug!("Display capture started: {}", track.id);

        Ok(CapturedStream {
            stream: MediaStream::new(format!("display-{}", track.id), vec![track]),
            ended: Some(rx),
        })
    }

    async fn capture_microphone(&self) -> Result<CapturedStream, CaptureError> {
        if self.deny_microphone.load(Ordering::SeqCst) {
            return Err(CaptureError::Denied("microphone access was declined".to_owned()));
        }
        let track = self.track(TrackKind::Audio, "microphone", None);
        debug!("Microphone capture started: {}", track.id);

        Ok(CapturedStream {
            stream: MediaStream::new(format!("mic-{}", track.id), vec![track]),
            ended: None,
        })
    }

    fn release(&self, track: &MediaTrack) {
        self.live.remove(&track.id);
        self.enders.remove(&track.id);
    }
}
