//! Transcript sinks
//!
//! Anything that accepts transcript text. One sink instance is created per
//! session by [`SinkBuilder`].

mod console;
mod log;
mod nats;

pub use console::ConsoleSink;
pub use log::LogSink;
pub use nats::NatsSink;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::SinkConfig;
use crate::error::BridgeError;
use crate::nats::NatsClient;

/// Out-of-band notifications about the upstream session
#[derive(Debug, Clone)]
pub enum SinkNotice {
    Opened,
    Closed,
    Error(BridgeError),
}

/// Consumer of transcript text
#[async_trait::async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Deliver one transcript. Empty-partial suppression happens before this.
    async fn emit(&self, text: &str, is_final: bool) -> Result<()>;

    /// Informational notice; logged by default
    async fn notify(&self, notice: SinkNotice) {
        match notice {
            SinkNotice::Opened => info!("Connected to real-time transcription service"),
            SinkNotice::Closed => info!("Disconnected from real-time transcription service"),
            SinkNotice::Error(e) => error!("{}", e),
        }
    }

    /// Sink name for logging
    fn name(&self) -> &str;
}

/// Which sink to deliver transcripts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Console,
    Log,
    Nats,
}

/// Creates per-session sinks from shared resources
#[derive(Clone)]
pub enum SinkBuilder {
    Console,
    Log,
    Nats(NatsClient),
    /// Caller-supplied sink shared by every session
    Custom(Arc<dyn TranscriptSink>),
}

impl SinkBuilder {
    pub async fn from_config(config: &SinkConfig) -> Result<Self> {
        Ok(match config.kind {
            SinkKind::Console => SinkBuilder::Console,
            SinkKind::Log => SinkBuilder::Log,
            SinkKind::Nats => {
                let client = NatsClient::connect(&config.nats_url, config.subject_prefix.clone())
                    .await?;
                SinkBuilder::Nats(client)
            }
        })
    }

    pub fn for_session(&self, session_id: &str) -> Arc<dyn TranscriptSink> {
        match self {
            SinkBuilder::Console => Arc::new(ConsoleSink::new()),
            SinkBuilder::Log => Arc::new(LogSink::new(session_id)),
            SinkBuilder::Nats(client) => Arc::new(NatsSink::new(client.clone(), session_id)),
            SinkBuilder::Custom(sink) => Arc::clone(sink),
        }
    }
}
