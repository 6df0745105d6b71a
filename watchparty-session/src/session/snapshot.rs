use crate::membership::SessionPhase;
use watchparty_core::{ChatMessage, PeerId, Room};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub identity: PeerId,
    pub username: String,
    pub is_host: bool,
    pub audio_enabled: bool,
    pub video_enabled: bool,
}

/// Point-in-time copy of everything a UI would render.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub local_id: Option<PeerId>,
    pub room: Option<Room>,
    /// Remote members only.
    pub participants: Vec<ParticipantInfo>,
    /// Open data channels, admitted or not.
    pub open_connections: usize,
    /// Dials still in flight.
    pub connecting: Vec<PeerId>,
    pub chat: Vec<ChatMessage>,
    pub pending_control_requests: Vec<PeerId>,
    pub granted_control: Vec<PeerId>,
    pub held_control: Vec<PeerId>,
    pub sharing_screen: bool,
    pub voice_enabled: bool,
    pub remote_streams: Vec<PeerId>,
    pub replayed_events: u64,
    pub ignored_events: u64,
    pub dropped_messages: u64,
}

impl SessionSnapshot {
    /// Everyone in the room including ourselves, sorted.
    pub fn members(&self) -> Vec<PeerId> {
        let mut members: Vec<PeerId> = self
            .participants
            .iter()
            .map(|p| p.identity.clone())
            .chain(self.local_id.clone().filter(|_| self.phase.in_room()))
            .collect();
        members.sort();
        members
    }

    pub fn participant(&self, peer: &PeerId) -> Option<&ParticipantInfo> {
        self.participants.iter().find(|p| p.identity == *peer)
    }
}
