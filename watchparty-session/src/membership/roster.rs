use crate::transport::DataChannel;
use std::collections::BTreeMap;
use std::sync::Arc;
use watchparty_core::PeerId;

/// A remote member with an open, admitted connection.
#[derive(Clone)]
pub struct Participant {
    pub identity: PeerId,
    pub username: String,
    pub is_host: bool,
    pub connection: Arc<dyn DataChannel>,
    pub audio_enabled: bool,
    pub video_enabled: bool,
}

impl Participant {
    pub fn new(identity: PeerId, username: String, connection: Arc<dyn DataChannel>) -> Self {
        Self {
            identity,
            username,
            is_host: false,
            connection,
            audio_enabled: false,
            video_enabled: false,
        }
    }
}

/// What a `hello` told us about a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Introduction {
    pub username: String,
    pub is_host: bool,
    pub audio_enabled: bool,
    pub video_enabled: bool,
}

/// Remote members keyed by identity. The local peer is never in here.
#[derive(Default)]
pub struct Roster {
    members: BTreeMap<PeerId, Participant>,
}

impl Roster {
    pub fn insert(&mut self, participant: Participant) -> Option<Participant> {
        self.members
            .insert(participant.identity.clone(), participant)
    }

    pub fn remove(&mut self, peer: &PeerId) -> Option<Participant> {
        self.members.remove(peer)
    }

    pub fn get(&self, peer: &PeerId) -> Option<&Participant> {
        self.members.get(peer)
    }

    pub fn get_mut(&mut self, peer: &PeerId) -> Option<&mut Participant> {
        self.members.get_mut(peer)
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.members.contains_key(peer)
    }

    pub fn ids(&self) -> Vec<PeerId> {
        self.members.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn introduce(&mut self, peer: &PeerId, intro: &Introduction) -> bool {
        let Some(p) = self.members.get_mut(peer) else {
            return false;
        };
        p.username = intro.username.clone();
        p.audio_enabled = intro.audio_enabled;
        p.video_enabled = intro.video_enabled;
        true
    }
}
