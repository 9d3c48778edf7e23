use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::transcription::{AudioEncoding, TranscriptEvent};

/// Configuration for one call session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on the transcriber handshake; `None` waits indefinitely
    pub connect_timeout: Option<Duration>,

    /// Media frames held while the handshake is pending; overflow is dropped
    pub max_pending_frames: usize,

    /// What reaches the sink
    pub policy: TranscriptPolicy,

    /// Format the transcriber was configured for, checked against the
    /// carrier's `start` metadata
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            max_pending_frames: 500,
            policy: TranscriptPolicy::default(),
            encoding: AudioEncoding::PcmMulaw,
            sample_rate: 8000,
        }
    }
}

/// Presentation rules applied before a transcript reaches the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptPolicy {
    /// Drop partials with empty text (silence). Finals always pass: even an
    /// empty one marks an utterance boundary.
    pub suppress_empty_partials: bool,
}

impl Default for TranscriptPolicy {
    fn default() -> Self {
        Self {
            suppress_empty_partials: true,
        }
    }
}

impl TranscriptPolicy {
    /// `(text, is_final)` to emit for this event, if any
    pub fn select<'a>(&self, event: &'a TranscriptEvent) -> Option<(&'a str, bool)> {
        match event {
            TranscriptEvent::Partial(text) => {
                if self.suppress_empty_partials && text.is_empty() {
                    None
                } else {
                    Some((text.as_str(), false))
                }
            }
            TranscriptEvent::Final(text) => Some((text.as_str(), true)),
            _ => None,
        }
    }
}
