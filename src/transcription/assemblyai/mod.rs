//! AssemblyAI Universal Streaming (v3) transcriber
//!
//! - Handshake: websocket upgrade with the API key in `Authorization`, then
//!   wait for the `Begin` message
//! - Audio: raw binary frames, at least `min_chunk_ms` each
//! - Shutdown: `{"type":"Terminate"}`, then read until `Termination`

mod client;
pub mod messages;

pub use client::AssemblyAiTranscriber;
