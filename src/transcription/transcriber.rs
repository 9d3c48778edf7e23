use bytes::Bytes;
use tokio::sync::mpsc;

use super::assemblyai::AssemblyAiTranscriber;
use super::config::TranscriberConfig;
use crate::error::TranscriberError;

/// Event emitted by a transcriber, in the order the upstream service produced it
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEvent {
    /// Upstream session established
    Opened,
    /// In-progress transcript for the current utterance
    Partial(String),
    /// Completed utterance
    Final(String),
    /// Non-fatal upstream failure
    Error(String),
    /// Upstream session ended
    Closed,
}

/// Real-time transcription client
///
/// Call order expected by the session:
/// 1. [`subscribe`](Transcriber::subscribe) once, before anything else
/// 2. [`connect`](Transcriber::connect), resolving when the handshake completes
/// 3. any number of [`send_audio`](Transcriber::send_audio) calls
/// 4. [`close`](Transcriber::close)
///
/// Once `close` has resolved, every event the transcriber will ever emit is
/// already in the subscription channel. The channel is unbounded: events may
/// be produced while the session is blocked on `close`.
#[async_trait::async_trait]
pub trait Transcriber: Send {
    /// Take the event receiver. Fails if called twice.
    fn subscribe(&mut self)
        -> Result<mpsc::UnboundedReceiver<TranscriptEvent>, TranscriberError>;

    /// Open the upstream session
    async fn connect(&mut self) -> Result<(), TranscriberError>;

    /// Forward raw audio bytes
    async fn send_audio(&mut self, audio: Bytes) -> Result<(), TranscriberError>;

    /// End the upstream session and wait for it to finish
    async fn close(&mut self) -> Result<(), TranscriberError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Builds the configured transcriber
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create(config: &TranscriberConfig) -> Result<Box<dyn Transcriber>, TranscriberError> {
        config.validate()?;
        Ok(Box::new(AssemblyAiTranscriber::new(config.clone())?))
    }
}
