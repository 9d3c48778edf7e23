use anyhow::Result;
use chrono::Utc;

use super::TranscriptSink;
use crate::nats::{NatsClient, TranscriptMessage};

/// Publishes transcripts to NATS for downstream consumers
pub struct NatsSink {
    client: NatsClient,
    session_id: String,
}

impl NatsSink {
    pub fn new(client: NatsClient, session_id: &str) -> Self {
        Self {
            client,
            session_id: session_id.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl TranscriptSink for NatsSink {
    async fn emit(&self, text: &str, is_final: bool) -> Result<()> {
        let message = TranscriptMessage {
            session_id: self.session_id.clone(),
            text: text.to_string(),
            partial: !is_final,
            timestamp: Utc::now().to_rfc3339(),
        };

        self.client.publish_transcript(&message).await
    }

    fn name(&self) -> &str {
        "nats"
    }
}
