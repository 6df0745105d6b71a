use crate::error::SessionError;
use crate::transport::TransportEvent;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use watchparty_core::{MediaStream, PeerId};

/// Provider-assigned id of one data channel. Both ends see the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch#{}", self.0)
    }
}

/// Provider-assigned id of one media call. Both ends see the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(pub u64);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call#{}", self.0)
    }
}

/// Factory for peer endpoints. Whatever has to be loaded or negotiated before
/// the first connection happens behind `open`.
#[async_trait]
pub trait ConnectivityProvider: Send + Sync + 'static {
    /// Bind a local identity. `Some(id)` must be bound exactly or fail;
    /// `None` lets the provider pick one.
    ///
    /// All callbacks for the endpoint (incoming channels, messages, closes,
    /// calls) are delivered as [`TransportEvent`]s through `events`.
    async fn open(
        &self,
        desired: Option<PeerId>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn PeerEndpoint>, SessionError>;
}

#[async_trait]
pub trait PeerEndpoint: Send + Sync {
    fn id(&self) -> PeerId;

    /// Dial `remote`. On success the provider posts `ChannelOpened` to both
    /// ends, the dialing side first.
    async fn connect(&self, remote: &PeerId) -> Result<(), SessionError>;

    async fn call(
        &self,
        remote: &PeerId,
        stream: MediaStream,
    ) -> Result<Arc<dyn MediaCall>, SessionError>;

    /// Close every channel and call and release the identity.
    async fn destroy(&self);
}

#[async_trait]
pub trait DataChannel: Send + Sync {
    fn id(&self) -> ChannelId;

    fn remote(&self) -> &PeerId;

    fn is_open(&self) -> bool;

    async fn send(&self, data: Bytes) -> Result<(), SessionError>;

    async fn close(&self);
}

#[async_trait]
pub trait MediaCall: Send + Sync {
    fn id(&self) -> CallId;

    fn remote(&self) -> &PeerId;

    /// Accept the call, optionally sending a stream back. `None` answers
    /// receive-only.
    async fn answer(&self, stream: Option<MediaStream>) -> Result<(), SessionError>;

    async fn close(&self);
}
