//! In-process connectivity provider.
//!
//! Every endpoint opened on the same [`MemoryNetwork`] can dial every other.
//! Messages are pushed straight into the receiver's event queue, so delivery
//! is ordered per channel and never lost while the channel is open.

use crate::error::SessionError;
use crate::transport::{
    CallId, ChannelId, ConnectivityProvider, DataChannel, MediaCall, PeerEndpoint,
    TransportEvent,
};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info};
use watchparty_core::{MediaStream, PeerId};

type EventSender = mpsc::UnboundedSender<TransportEvent>;

#[derive(Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<NetworkInner>,
}

#[derive(Default)]
struct NetworkInner {
    endpoints: DashMap<PeerId, Arc<EndpointShared>>,
    unreachable: DashSet<PeerId>,
    offline: AtomicBool,
    next_id: AtomicU64,
}

impl NetworkInner {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn reachable(&self, peer: &PeerId) -> Result<Arc<EndpointShared>, SessionError> {
        if self.unreachable.contains(peer) {
            return Err(SessionError::connect_failed(peer, "peer unreachable"));
        }
        self.endpoints
            .get(peer)
            .map(|e| e.value().clone())
            .ok_or_else(|| SessionError::connect_failed(peer, "no such peer"))
    }
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the provider failing to load: every `open` fails until reset.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Make dials and calls to `peer` fail as if it were behind a hostile NAT.
    pub fn set_unreachable(&self, peer: &PeerId, unreachable: bool) {
        if unreachable {
            self.inner.unreachable.insert(peer.clone());
        } else {
            self.inner.unreachable.remove(peer);
        }
    }

    pub fn is_bound(&self, peer: &PeerId) -> bool {
        self.inner.endpoints.contains_key(peer)
    }

    pub fn endpoint_count(&self) -> usize {
        self.inner.endpoints.len()
    }

    /// Drop one live channel between `a` and `b` without either side asking,
    /// as a network failure would.
    pub fn sever(&self, a: &PeerId, b: &PeerId) -> bool {
        let Some(endpoint) = self.inner.endpoints.get(a).map(|e| e.value().clone()) else {
            return false;
        };
        let link = endpoint
            .links
            .iter()
            .find(|l| l.value().has_ends(a, b) && !l.value().is_closed())
            .map(|l| l.value().clone());
        match link {
            Some(link) => {
                link.close();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ConnectivityProvider for MemoryNetwork {
    async fn open(
        &self,
        desired: Option<PeerId>,
        events: EventSender,
    ) -> Result<Arc<dyn PeerEndpoint>, SessionError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(SessionError::TransportUnavailable(
                "memory network is offline".to_owned(),
            ));
        }

        let id = desired.unwrap_or_else(PeerId::random);
        let shared = Arc::new(EndpointShared {
            id: id.clone(),
            events,
            links: DashMap::new(),
            calls: DashMap::new(),
            destroyed: AtomicBool::new(false),
        });

        match self.inner.endpoints.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(SessionError::TransportUnavailable(format!(
                    "identity {id} is already taken"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(shared.clone());
            }
        }

        debug!("Memory endpoint {} bound", id);
        Ok(Arc::new(MemoryEndpoint {
            shared,
            network: Arc::downgrade(&self.inner),
        }))
    }
}

struct EndpointShared {
    id: PeerId,
    events: EventSender,
    links: DashMap<ChannelId, Arc<Link>>,
    calls: DashMap<CallId, Arc<CallLink>>,
    destroyed: AtomicBool,
}

struct MemoryEndpoint {
    shared: Arc<EndpointShared>,
    network: Weak<NetworkInner>,
}

impl MemoryEndpoint {
    fn network(&self) -> Result<Arc<NetworkInner>, SessionError> {
        if self.shared.destroyed.load(Ordering::SeqCst) {
            return Err(SessionError::invalid_state("endpoint destroyed"));
        }
        self.network
            .upgrade()
            .ok_or_else(|| SessionError::TransportUnavailable("network dropped".to_owned()))
    }
}

#[async_trait]
impl PeerEndpoint for MemoryEndpoint {
    fn id(&self) -> PeerId {
        self.shared.id.clone()
    }

    async fn connect(&self, remote: &PeerId) -> Result<(), SessionError> {
        let network = self.network()?;
        let target = network.reachable(remote)?;
        if target.destroyed.load(Ordering::SeqCst) {
            return Err(SessionError::connect_failed(remote, "peer is shutting down"));
        }

        let link = Arc::new(Link {
            id: ChannelId(network.next_id()),
            a: self.shared.id.clone(),
            a_events: self.shared.events.clone(),
            b: remote.clone(),
            b_events: target.events.clone(),
            ends: [Arc::downgrade(&self.shared), Arc::downgrade(&target)],
            closed: AtomicBool::new(false),
        });
        self.shared.links.insert(link.id, link.clone());
        target.links.insert(link.id, link.clone());

        debug!("{} opened {} to {}", self.shared.id, link.id, remote);

        let local_end = Arc::new(MemoryChannel {
            link: link.clone(),
            local_is_a: true,
        });
        let remote_end = Arc::new(MemoryChannel {
            link: link.clone(),
            local_is_a: false,
        });
        let _ = link.a_events.send(TransportEvent::ChannelOpened {
            peer: link.b.clone(),
            channel: local_end,
            initiated_locally: true,
        });
        let _ = link.b_events.send(TransportEvent::ChannelOpened {
            peer: link.a.clone(),
            channel: remote_end,
            initiated_locally: false,
        });
        Ok(())
    }

    async fn call(
        &self,
        remote: &PeerId,
        stream: MediaStream,
    ) -> Result<Arc<dyn MediaCall>, SessionError> {
        let network = self.network()?;
        let target = network.reachable(remote)?;

        let call = Arc::new(CallLink {
            id: CallId(network.next_id()),
            caller: self.shared.id.clone(),
            caller_events: self.shared.events.clone(),
            callee: remote.clone(),
            callee_events: target.events.clone(),
            offered: stream,
            ends: [Arc::downgrade(&self.shared), Arc::downgrade(&target)],
            closed: AtomicBool::new(false),
        });
        self.shared.calls.insert(call.id, call.clone());
        target.calls.insert(call.id, call.clone());

        let _ = call.callee_events.send(TransportEvent::IncomingCall {
            peer: call.caller.clone(),
            call: Arc::new(MemoryCall {
                link: call.clone(),
                local_is_caller: false,
            }),
        });

        Ok(Arc::new(MemoryCall {
            link: call,
            local_is_caller: true,
        }))
    }

    async fn destroy(&self) {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        let links: Vec<_> = self.shared.links.iter().map(|l| l.value().clone()).collect();
        for link in links {
            link.close();
        }
        let calls: Vec<_> = self.shared.calls.iter().map(|c| c.value().clone()).collect();
        for call in calls {
            call.close();
        }

        if let Some(network) = self.network.upgrade() {
            network
                .endpoints
                .remove_if(&self.shared.id, |_, e| Arc::ptr_eq(e, &self.shared));
        }
        info!("Memory endpoint {} released", self.shared.id);
    }
}

struct Link {
    id: ChannelId,
    a: PeerId,
    a_events: EventSender,
    b: PeerId,
    b_events: EventSender,
    ends: [Weak<EndpointShared>; 2],
    closed: AtomicBool,
}

impl Link {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn has_ends(&self, x: &PeerId, y: &PeerId) -> bool {
        (self.a == *x && self.b == *y) || (self.a == *y && self.b == *x)
    }

    /// First close wins; both ends hear about it exactly once and drop the
    /// link from their tables.
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for end in self.ends.iter().filter_map(Weak::upgrade) {
            end.links.remove(&self.id);
        }
        let _ = self.a_events.send(TransportEvent::ChannelClosed {
            peer: self.b.clone(),
            channel: self.id,
        });
        let _ = self.b_events.send(TransportEvent::ChannelClosed {
            peer: self.a.clone(),
            channel: self.id,
        });
    }
}

struct MemoryChannel {
    link: Arc<Link>,
    local_is_a: bool,
}

#[async_trait]
impl DataChannel for MemoryChannel {
    fn id(&self) -> ChannelId {
        self.link.id
    }

    fn remote(&self) -> &PeerId {
        if self.local_is_a {
            &self.link.b
        } else {
            &self.link.a
        }
    }

    fn is_open(&self) -> bool {
        !self.link.is_closed()
    }

    async fn send(&self, data: Bytes) -> Result<(), SessionError> {
        if self.link.is_closed() {
            return Err(SessionError::SendFailed {
                peer: self.remote().clone(),
                reason: "channel closed".to_owned(),
            });
        }
        let (sender, to) = if self.local_is_a {
            (&self.link.a, &self.link.b_events)
        } else {
            (&self.link.b, &self.link.a_events)
        };
        to.send(TransportEvent::Message {
            peer: sender.clone(),
            channel: self.link.id,
            data,
        })
        .map_err(|_| SessionError::SendFailed {
            peer: self.remote().clone(),
            reason: "peer stopped listening".to_owned(),
        })
    }

    async fn close(&self) {
        self.link.close();
    }
}

struct CallLink {
    id: CallId,
    caller: PeerId,
    caller_events: EventSender,
    callee: PeerId,
    callee_events: EventSender,
    offered: MediaStream,
    ends: [Weak<EndpointShared>; 2],
    closed: AtomicBool,
}

impl CallLink {
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for end in self.ends.iter().filter_map(Weak::upgrade) {
            end.calls.remove(&self.id);
        }
        let _ = self.caller_events.send(TransportEvent::CallClosed {
            peer: self.callee.clone(),
            call: self.id,
        });
        let _ = self.callee_events.send(TransportEvent::CallClosed {
            peer: self.caller.clone(),
            call: self.id,
        });
    }
}

struct MemoryCall {
    link: Arc<CallLink>,
    local_is_caller: bool,
}

#[async_trait]
impl MediaCall for MemoryCall {
    fn id(&self) -> CallId {
        self.link.id
    }

    fn remote(&self) -> &PeerId {
        if self.local_is_caller {
            &self.link.callee
        } else {
            &self.link.caller
        }
    }

    async fn answer(&self, stream: Option<MediaStream>) -> Result<(), SessionError> {
        if self.local_is_caller {
            return Err(SessionError::invalid_state("caller cannot answer its own call"));
        }
        if self.link.closed.load(Ordering::SeqCst) {
            return Err(SessionError::connect_failed(&self.link.caller, "call already closed"));
        }

        let _ = self.link.callee_events.send(TransportEvent::RemoteStream {
            peer: self.link.caller.clone(),
            call: self.link.id,
            stream: self.link.offered.clone(),
        });
        if let Some(stream) = stream {
            let _ = self.link.caller_events.send(TransportEvent::RemoteStream {
                peer: self.link.callee.clone(),
                call: self.link.id,
                stream,
            });
        }
        Ok(())
    }

    async fn close(&self) {
        self.link.close();
    }
}
