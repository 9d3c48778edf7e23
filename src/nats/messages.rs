use serde::{Deserialize, Serialize};

/// Transcript published to NATS, one per emitted partial or final
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String, // RFC3339 timestamp
}
