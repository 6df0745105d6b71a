use serde::{Deserialize, Serialize};

/// One entry of the per-session chat log.
///
/// The log is ordered by local receipt, not by `timestamp`: two guests may
/// see each other's messages interleaved differently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: String,
    pub text: String,
    pub timestamp: u64,
    pub is_host: bool,
}
