use std::fmt;

/// Where the local session stands.
///
/// `Creating` and `Joining` only last while the transport opens and the host
/// answers; both settle into `Hosting`/`Joined` or fall back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Creating,
    Hosting,
    Joining,
    Joined,
}

impl SessionPhase {
    /// Hosting or joined: there is a room and a roster.
    pub fn in_room(self) -> bool {
        matches!(self, SessionPhase::Hosting | SessionPhase::Joined)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Creating => "creating",
            SessionPhase::Hosting => "hosting",
            SessionPhase::Joining => "joining",
            SessionPhase::Joined => "joined",
        };
        f.write_str(name)
    }
}
