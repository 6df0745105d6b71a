use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use watchparty_core::PeerId;
use watchparty_session::{SessionNotice, SessionObserver};

/// A test observer that records every notice a session emits.
///
/// # Example
///
/// ```ignore
/// let observer = RecordingObserver::new();
/// // ... spawn a session with this observer ...
/// assert!(observer.wait_for(|n| matches!(n, SessionNotice::Joined { .. }), 2000).await);
/// ```
#[derive(Clone, Default)]
pub struct RecordingObserver {
    notices: Arc<Mutex<Vec<SessionNotice>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded notices (convenience method).
    pub async fn get_notices(&self) -> Vec<SessionNotice> {
        self.notices.lock().await.clone()
    }

    pub async fn count(&self, pred: impl Fn(&SessionNotice) -> bool) -> usize {
        self.notices.lock().await.iter().filter(|n| pred(n)).count()
    }

    /// Wait until some recorded notice matches `pred`.
    pub async fn wait_for(&self, pred: impl Fn(&SessionNotice) -> bool, timeout_ms: u64) -> bool {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(timeout_ms);

        loop {
            if self.notices.lock().await.iter().any(&pred) {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    pub async fn has_joined(&self, peer: &PeerId) -> bool {
        self.notices.lock().await.iter().any(
            |n| matches!(n, SessionNotice::ParticipantJoined { peer: p, .. } if p == peer),
        )
    }

    pub async fn has_left(&self, peer: &PeerId) -> bool {
        self.notices
            .lock()
            .await
            .iter()
            .any(|n| matches!(n, SessionNotice::ParticipantLeft { peer: p } if p == peer))
    }
}

#[async_trait]
impl SessionObserver for RecordingObserver {
    async fn on_notice(&self, notice: SessionNotice) {
        tracing::info!("[RecordingObserver] {}", notice);
        self.notices.lock().await.push(notice);
    }
}
