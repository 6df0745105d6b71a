use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use watchparty_core::{PeerId, WireMessage};
use watchparty_session::{
    ConnectivityProvider, DataChannel, MemoryNetwork, PeerEndpoint, TransportEvent,
};

/// A bare endpoint on the memory network with no session behind it.
///
/// Lets a test speak the wire protocol directly, the way a modified client
/// or a host that never answers would.
pub struct RawPeer {
    endpoint: Arc<dyn PeerEndpoint>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl RawPeer {
    pub async fn open(network: &MemoryNetwork, id: Option<PeerId>) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let endpoint = network
            .open(id, tx)
            .await
            .expect("Failed to open raw endpoint");
        Self { endpoint, events }
    }

    pub fn id(&self) -> PeerId {
        self.endpoint.id()
    }

    /// Dial `remote` and wait for the channel to open.
    pub async fn dial(&mut self, remote: &PeerId) -> Arc<dyn DataChannel> {
        self.endpoint
            .connect(remote)
            .await
            .expect("Failed to dial");

        loop {
            match self.next_event(2000).await {
                Some(TransportEvent::ChannelOpened { peer, channel, .. }) if peer == *remote => {
                    return channel;
                }
                Some(_) => continue,
                None => panic!("No channel to {remote} opened"),
            }
        }
    }

    pub async fn send(&self, channel: &Arc<dyn DataChannel>, message: &WireMessage) {
        channel
            .send(message.encode().expect("Failed to encode"))
            .await
            .expect("Failed to send");
    }

    /// Next decoded message from anyone, skipping other events.
    pub async fn next_message(&mut self, timeout_ms: u64) -> Option<WireMessage> {
        loop {
            match self.next_event(timeout_ms).await? {
                TransportEvent::Message { data, .. } => {
                    return Some(WireMessage::decode(&data).expect("Failed to decode"));
                }
                _ => continue,
            }
        }
    }

    pub async fn next_event(&mut self, timeout_ms: u64) -> Option<TransportEvent> {
        tokio::time::timeout(Duration::from_millis(timeout_ms), self.events.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn close(&self) {
        self.endpoint.destroy().await;
    }
}
