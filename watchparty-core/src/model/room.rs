use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Rooms live for six hours after creation unless destroyed earlier.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(6 * 60 * 60);

/// Room identifier. The host binds its transport identity to this value so
/// guests can dial it directly.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `<prefix>-<12 hex chars>`, short enough to read out loud.
    pub fn generate(prefix: &str) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", prefix, &token[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_peer_id(&self) -> PeerId {
        PeerId::new(self.0.clone())
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A password-protected session namespace.
///
/// The host holds the authoritative copy; guests hold a local copy built from
/// the `join-accepted` reply. Neither copy is a security boundary: both checks
/// run only on cooperating clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub room_id: RoomId,
    pub password: String,
    /// Milliseconds since the Unix epoch, on the creating host's clock.
    pub created_at: u64,
    pub host: PeerId,
}

impl Room {
    /// A room is expired once strictly more than `window` has elapsed; at
    /// exactly `window` it is still valid.
    pub fn is_expired_at(&self, now_ms: u64, window: Duration) -> bool {
        expired(self.created_at, now_ms, window)
    }

    /// Time left before expiry, zero if already expired.
    pub fn remaining_at(&self, now_ms: u64, window: Duration) -> Duration {
        let elapsed = Duration::from_millis(now_ms.saturating_sub(self.created_at));
        window.saturating_sub(elapsed)
    }
}

fn expired(created_at: u64, now_ms: u64, window: Duration) -> bool {
    u128::from(now_ms.saturating_sub(created_at)) > window.as_millis()
}
