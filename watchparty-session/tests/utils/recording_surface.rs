use std::sync::{Arc, Mutex};
use watchparty_session::{DispatchTarget, ElementRef, ReplaySurface, SyntheticEvent, Viewport};

/// A grantor page that remembers every injected event.
#[derive(Clone)]
pub struct RecordingSurface {
    viewport: Viewport,
    dispatched: Arc<Mutex<Vec<(DispatchTarget, SyntheticEvent)>>>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            dispatched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn events(&self) -> Vec<SyntheticEvent> {
        self.dispatched
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn targets(&self) -> Vec<DispatchTarget> {
        self.dispatched
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub async fn wait_for_events(&self, count: usize, timeout_ms: u64) -> bool {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(timeout_ms);

        loop {
            if self.dispatched.lock().unwrap().len() >= count {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

impl ReplaySurface for RecordingSurface {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The left half of the page is a "player" element, the rest is empty.
    fn element_at(&self, client_x: f64, _client_y: f64) -> Option<ElementRef> {
        (client_x < self.viewport.width / 2.0).then(|| ElementRef("player".to_owned()))
    }

    fn dispatch(&self, target: DispatchTarget, event: SyntheticEvent) {
        self.dispatched.lock().unwrap().push((target, event));
    }
}
