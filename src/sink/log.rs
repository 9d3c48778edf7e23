use anyhow::Result;
use tracing::info;

use super::TranscriptSink;

/// Emits transcripts as tracing events
#[derive(Debug)]
pub struct LogSink {
    session_id: String,
}

impl LogSink {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl TranscriptSink for LogSink {
    async fn emit(&self, text: &str, is_final: bool) -> Result<()> {
        info!(session_id = %self.session_id, is_final, "{}", text);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
