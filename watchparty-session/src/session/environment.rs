use crate::clock::{Clock, SystemClock};
use crate::control::{NullSurface, ReplaySurface};
use crate::media::{CaptureDevices, NullPlayback, PlaybackSink, StaticDevices};
use crate::session::{SessionObserver, TracingObserver};
use crate::transport::ConnectivityProvider;
use std::sync::Arc;

/// Everything a session reaches outside itself.
#[derive(Clone)]
pub struct SessionEnvironment {
    pub provider: Arc<dyn ConnectivityProvider>,
    pub observer: Arc<dyn SessionObserver>,
    pub devices: Arc<dyn CaptureDevices>,
    pub playback: Arc<dyn PlaybackSink>,
    pub surface: Arc<dyn ReplaySurface>,
    pub clock: Arc<dyn Clock>,
}

impl SessionEnvironment {
    /// Headless defaults: capture refused, media and replay discarded,
    /// notices logged.
    pub fn new(provider: Arc<dyn ConnectivityProvider>) -> Self {
        Self {
            provider,
            observer: Arc::new(TracingObserver),
            devices: Arc::new(StaticDevices::denied()),
            playback: Arc::new(NullPlayback),
            surface: Arc::new(NullSurface::default()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_devices(mut self, devices: Arc<dyn CaptureDevices>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_playback(mut self, playback: Arc<dyn PlaybackSink>) -> Self {
        self.playback = playback;
        self
    }

    pub fn with_surface(mut self, surface: Arc<dyn ReplaySurface>) -> Self {
        self.surface = surface;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
