use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::SessionState;

/// Statistics about a call session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    /// Carrier identifiers from the `start` message
    pub stream_sid: Option<String>,
    pub call_sid: Option<String>,

    /// When the socket was accepted
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Media frames received from the carrier
    pub frames_received: usize,

    /// Media frames handed to the transcriber
    pub frames_forwarded: usize,

    /// Media frames never forwarded (queue overflow, failed connect, after stop)
    pub frames_dropped: usize,

    /// Inbound messages that failed to decode
    pub malformed_frames: usize,

    pub partials_emitted: usize,
    pub finals_emitted: usize,

    /// Error events reported by the transcriber
    pub upstream_errors: usize,

    /// The socket closed without a `stop` message
    pub ended_without_stop: bool,

    /// The transcriber handshake completed
    pub transcriber_connected: bool,

    pub state: SessionState,
}
