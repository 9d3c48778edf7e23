use anyhow::{Context, Result};
use async_nats::Client;
use tracing::{debug, info};

use super::messages::TranscriptMessage;

/// Shared NATS connection used by every session's transcript sink
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
    subject_prefix: String,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, subject_prefix: impl Into<String>) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            subject_prefix: subject_prefix.into(),
        })
    }

    /// `{prefix}.partial` or `{prefix}.final`
    pub fn subject_for(subject_prefix: &str, partial: bool) -> String {
        let kind = if partial { "partial" } else { "final" };
        format!("{}.{}", subject_prefix, kind)
    }

    /// Publish one transcript
    pub async fn publish_transcript(&self, message: &TranscriptMessage) -> Result<()> {
        let subject = Self::subject_for(&self.subject_prefix, message.partial);
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish transcript")?;

        debug!(
            "Published transcript to {} (session={}, chars={})",
            subject,
            message.session_id,
            message.text.len()
        );

        Ok(())
    }
}
