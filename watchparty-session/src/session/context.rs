use crate::error::SessionError;
use crate::transport::{ChannelId, DataChannel};
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error};
use watchparty_core::{PeerId, WireMessage};

/// Table of open data channels, keyed by the remote peer.
///
/// Every component sends through this table and never dials on its own.
/// Cloning is cheap and shares the same table.
#[derive(Clone, Default)]
pub struct SessionContext {
    channels: Arc<DashMap<PeerId, Arc<dyn DataChannel>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, peer: &PeerId) -> Option<Arc<dyn DataChannel>> {
        self.channels.get(peer).map(|c| c.value().clone())
    }

    /// Returns the channel previously registered for `peer`, if any.
    pub(crate) fn register(
        &self,
        peer: PeerId,
        channel: Arc<dyn DataChannel>,
    ) -> Option<Arc<dyn DataChannel>> {
        self.channels.insert(peer, channel)
    }

    /// Remove `peer` only if its registered channel is `channel`. Closes of
    /// channels that were already replaced return `false`.
    pub(crate) fn unregister(&self, peer: &PeerId, channel: ChannelId) -> bool {
        self.channels
            .remove_if(peer, |_, c| c.id() == channel)
            .is_some()
    }

    pub(crate) fn drain(&self) -> Vec<Arc<dyn DataChannel>> {
        let peers = self.peers();
        peers
            .iter()
            .filter_map(|p| self.channels.remove(p).map(|(_, c)| c))
            .collect()
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.channels.contains_key(peer)
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.channels.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub async fn send(&self, peer: &PeerId, message: &WireMessage) -> Result<(), SessionError> {
        let Some(channel) = self.channel(peer) else {
            error!(
                "Attempted to send {} to disconnected peer {}",
                message.type_name(),
                peer
            );
            return Err(SessionError::SendFailed {
                peer: peer.clone(),
                reason: "no open connection".to_owned(),
            });
        };

        let data = message.encode()?;
        debug!("-> {} {}", peer, message.type_name());
        channel.send(data).await.inspect_err(|e| {
            error!("Failed to send {} to {}: {}", message.type_name(), peer, e);
        })
    }

    /// Send one message to several peers concurrently. Failures are logged
    /// per peer; returns how many sends succeeded.
    pub async fn send_many(&self, peers: &[PeerId], message: &WireMessage) -> usize {
        let data = match message.encode() {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to encode {}: {}", message.type_name(), e);
                return 0;
            }
        };

        let targets: Vec<_> = peers
            .iter()
            .filter_map(|p| self.channel(p).map(|c| (p.clone(), c)))
            .collect();

        let sends = targets.into_iter().map(|(peer, channel)| {
            let data = data.clone();
            async move {
                match channel.send(data).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Broadcast to {} failed: {}", peer, e);
                        false
                    }
                }
            }
        });

        join_all(sends).await.into_iter().filter(|ok| *ok).count()
    }

    pub async fn broadcast(&self, message: &WireMessage) -> usize {
        let peers = self.peers();
        self.send_many(&peers, message).await
    }
}
