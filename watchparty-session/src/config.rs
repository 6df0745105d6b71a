use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Session tuning. Every field has a default, so `{}` is a valid config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Room lifetime after creation.
    pub room_expiry_secs: u64,

    /// How long a guest waits for `join-accepted`/`join-rejected`.
    /// `None` keeps the join pending until the connection itself fails.
    pub join_timeout_secs: Option<u64>,

    /// Capacity of the API command queue.
    pub command_buffer: usize,

    /// Prefix of generated room ids.
    pub room_id_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            room_expiry_secs: 6 * 60 * 60,
            join_timeout_secs: Some(30),
            command_buffer: 100,
            room_id_prefix: "party".to_owned(),
        }
    }
}

impl SessionConfig {
    pub fn room_expiry(&self) -> Duration {
        Duration::from_secs(self.room_expiry_secs)
    }

    pub fn join_timeout(&self) -> Option<Duration> {
        self.join_timeout_secs.map(Duration::from_secs)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse session config")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&raw)
    }
}
