use thiserror::Error;

/// Failure to turn one inbound media-stream message into an [`AudioFrame`].
///
/// Always recoverable: the session logs it and skips the message.
///
/// [`AudioFrame`]: crate::media::AudioFrame
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("malformed frame: missing or non-string `event` field")]
    MissingEvent,

    #[error("malformed frame: `{event}` message has an invalid body: {reason}")]
    InvalidBody { event: String, reason: String },

    #[error("malformed frame: media payload is not valid base64: {0}")]
    InvalidPayload(#[from] base64::DecodeError),
}

/// Errors raised by a [`Transcriber`](crate::transcription::Transcriber).
#[derive(Debug, Clone, Error)]
pub enum TranscriberError {
    #[error("invalid transcriber configuration: {0}")]
    Configuration(String),

    #[error("failed to connect to transcription service: {0}")]
    ConnectFailure(String),

    #[error("transcriber is not connected")]
    NotConnected,

    #[error("failed to send audio: {0}")]
    Send(String),

    #[error("event stream already subscribed")]
    AlreadySubscribed,
}

/// Session-level failure taxonomy reported to sinks and logs.
///
/// None of these end a session on their own. A peer disconnecting without a
/// `stop` message is not an error and is tracked in
/// [`SessionStats::ended_without_stop`](crate::session::SessionStats).
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    #[error("skipped inbound message: {0}")]
    MalformedFrame(String),

    #[error("transcriber connect failed: {0}")]
    AdapterConnectFailure(String),

    #[error("transcriber runtime error: {0}")]
    AdapterRuntimeError(String),
}

impl From<&FrameError> for BridgeError {
    fn from(err: &FrameError) -> Self {
        BridgeError::MalformedFrame(err.to_string())
    }
}
