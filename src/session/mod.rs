//! Call session management
//!
//! This module provides the `CallSession` bridge that manages:
//! - Decoding media-stream messages from the carrier socket
//! - Holding audio until the transcriber handshake completes
//! - Forwarding audio in arrival order
//! - Dispatching transcripts to the sink
//! - Closing the transcriber exactly once on teardown

mod config;
mod gate;
mod session;
mod stats;

pub use config::{SessionConfig, TranscriptPolicy};
pub use gate::{Admission, AudioGate};
pub use session::{CallSession, SessionState};
pub use stats::SessionStats;
