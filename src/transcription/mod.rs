//! Upstream real-time transcription
//!
//! [`Transcriber`] is the seam the session bridge depends on;
//! [`AssemblyAiTranscriber`] is the production implementation.

pub mod assemblyai;
pub mod config;
pub mod transcriber;

pub use assemblyai::AssemblyAiTranscriber;
pub use config::{AudioEncoding, TranscriberConfig};
pub use transcriber::{Transcriber, TranscriberFactory, TranscriptEvent};
