use crate::error::SessionError;
use crate::transport::{ConnectivityProvider, MediaCall, PeerEndpoint, TransportEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use watchparty_core::{MediaStream, PeerId};

/// The local end of the mesh: one bound identity plus the dials in flight.
pub struct PeerTransport {
    endpoint: Arc<dyn PeerEndpoint>,
    events: mpsc::UnboundedSender<TransportEvent>,
    dialing: HashSet<PeerId>,
    destroyed: bool,
}

impl PeerTransport {
    pub async fn open(
        provider: &dyn ConnectivityProvider,
        desired: Option<PeerId>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self, SessionError> {
        let endpoint = provider.open(desired.clone(), events.clone()).await?;

        if let Some(desired) = desired
            && endpoint.id() != desired
        {
            endpoint.destroy().await;
            return Err(SessionError::TransportUnavailable(format!(
                "provider bound {} instead of {}",
                endpoint.id(),
                desired
            )));
        }

        info!("Transport open as {}", endpoint.id());

        Ok(Self {
            endpoint,
            events,
            dialing: HashSet::new(),
            destroyed: false,
        })
    }

    pub fn local_id(&self) -> PeerId {
        self.endpoint.id()
    }

    /// Peers with a dial in flight, sorted.
    pub fn dialing(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.dialing.iter().cloned().collect();
        peers.sort();
        peers
    }

    /// Dial in the background. Returns `false` when a dial to `remote` is
    /// already in flight or `remote` is ourselves.
    pub fn connect(&mut self, remote: &PeerId) -> bool {
        if self.destroyed || *remote == self.endpoint.id() {
            return false;
        }
        if !self.dialing.insert(remote.clone()) {
            debug!("Already dialing {}", remote);
            return false;
        }

        let endpoint = self.endpoint.clone();
        let events = self.events.clone();
        let remote = remote.clone();
        tokio::spawn(async move {
            let Err(e) = endpoint.connect(&remote).await else {
                return;
            };
            warn!("Dial to {} failed: {}", remote, e);
            let reason = match e {
                SessionError::ConnectFailed { reason, .. } => reason,
                other => other.to_string(),
            };
            let _ = events.send(TransportEvent::ConnectFailed {
                peer: remote,
                reason,
            });
        });
        true
    }

    /// Forget an in-flight dial once its outcome has been observed. Returns
    /// `false` if no dial to `remote` was in flight.
    pub fn dial_finished(&mut self, remote: &PeerId) -> bool {
        self.dialing.remove(remote)
    }

    pub async fn call(
        &self,
        remote: &PeerId,
        stream: MediaStream,
    ) -> Result<Arc<dyn MediaCall>, SessionError> {
        if self.destroyed {
            return Err(SessionError::invalid_state("transport destroyed"));
        }
        self.endpoint.call(remote, stream).await
    }

    pub async fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.dialing.clear();
        self.endpoint.destroy().await;
        info!("Transport {} destroyed", self.endpoint.id());
    }
}
