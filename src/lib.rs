pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod nats;
pub mod session;
pub mod sink;
pub mod transcription;

pub use config::Config;
pub use error::{BridgeError, FrameError, TranscriberError};
pub use http::{create_router, AppState};
pub use media::{AudioFrame, MediaFormat};
pub use nats::{NatsClient, TranscriptMessage};
pub use session::{CallSession, SessionConfig, SessionState, SessionStats, TranscriptPolicy};
pub use sink::{SinkBuilder, SinkKind, SinkNotice, TranscriptSink};
pub use transcription::{
    AudioEncoding, Transcriber, TranscriberConfig, TranscriberFactory, TranscriptEvent,
};
