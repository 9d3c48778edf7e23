use serde::{Deserialize, Serialize};

use crate::error::TranscriberError;

/// Lowest sample rate the upstream service accepts (narrowband telephony)
pub const MIN_SAMPLE_RATE: u32 = 8000;

/// Highest sample rate the upstream service accepts
pub const MAX_SAMPLE_RATE: u32 = 48000;

/// Audio encodings the upstream service understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    /// 8-bit mu-law, what telephony carriers stream
    #[default]
    PcmMulaw,
    /// 16-bit signed little-endian PCM
    PcmS16le,
}

impl AudioEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PcmMulaw => "pcm_mulaw",
            Self::PcmS16le => "pcm_s16le",
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::PcmMulaw => 1,
            Self::PcmS16le => 2,
        }
    }
}

/// Construction-time configuration for a [`Transcriber`](super::Transcriber)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Credential for the transcription service
    pub api_key: String,

    #[serde(default)]
    pub encoding: AudioEncoding,

    /// Default: 8000 Hz, the carrier's narrowband rate
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Websocket base URL, without path
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Ask the service for punctuated, cased final transcripts
    #[serde(default = "default_format_turns")]
    pub format_turns: bool,

    /// Audio is buffered until at least this much is available before sending
    #[serde(default = "default_min_chunk_ms")]
    pub min_chunk_ms: u32,
}

fn default_sample_rate() -> u32 {
    8000
}

fn default_base_url() -> String {
    "wss://streaming.assemblyai.com".to_string()
}

fn default_format_turns() -> bool {
    true
}

fn default_min_chunk_ms() -> u32 {
    50
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            encoding: AudioEncoding::default(),
            sample_rate: default_sample_rate(),
            base_url: default_base_url(),
            format_turns: default_format_turns(),
            min_chunk_ms: default_min_chunk_ms(),
        }
    }
}

impl TranscriberConfig {
    pub fn validate(&self) -> Result<(), TranscriberError> {
        if self.api_key.trim().is_empty() {
            return Err(TranscriberError::Configuration(
                "transcription API key is required".to_string(),
            ));
        }

        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(TranscriberError::Configuration(format!(
                "sample rate {} Hz is outside supported range ({}-{} Hz)",
                self.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
            )));
        }

        Ok(())
    }

    /// Number of bytes that make up `min_chunk_ms` of audio
    pub fn min_chunk_bytes(&self) -> usize {
        self.sample_rate as usize * self.encoding.bytes_per_sample() * self.min_chunk_ms as usize
            / 1000
    }
}
