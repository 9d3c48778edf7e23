use base64::Engine;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::messages::{ConnectedMessage, MediaFormat, MediaMessage, StartMessage, StopMessage};
use crate::error::FrameError;
use crate::transcription::AudioEncoding;

/// One decoded message from the telephony media-stream socket
#[derive(Debug, Clone, PartialEq)]
pub enum AudioFrame {
    /// Socket handshake acknowledged by the carrier
    Connected {
        protocol: Option<String>,
        version: Option<String>,
    },

    /// Stream metadata, sent once before any media
    Started {
        stream_sid: Option<String>,
        call_sid: Option<String>,
        media_format: Option<MediaFormat>,
    },

    /// A chunk of raw audio, already base64-decoded
    Media {
        payload: Bytes,
        track: Option<String>,
        chunk: Option<u64>,
        timestamp_ms: Option<u64>,
    },

    /// The carrier ended the stream
    Stopped { stream_sid: Option<String> },

    /// A well-formed message with an event tag this service does not handle
    Ignored { event: String },
}

impl AudioFrame {
    /// Decode one text message.
    ///
    /// The media payload is base64-decoded here, so downstream code only ever
    /// sees raw audio bytes. Unknown event tags decode to [`AudioFrame::Ignored`].
    pub fn decode(raw: &str) -> Result<Self, FrameError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        let event = value
            .get("event")
            .and_then(|e| e.as_str())
            .ok_or(FrameError::MissingEvent)?
            .to_string();

        match event.as_str() {
            "connected" => {
                let msg: ConnectedMessage = body(&event, value)?;
                Ok(AudioFrame::Connected {
                    protocol: msg.protocol,
                    version: msg.version,
                })
            }
            "start" => {
                let msg: StartMessage = body(&event, value)?;
                let start = msg.start.unwrap_or_default();
                Ok(AudioFrame::Started {
                    stream_sid: start.stream_sid.or(msg.stream_sid),
                    call_sid: start.call_sid,
                    media_format: start.media_format,
                })
            }
            "media" => {
                let msg: MediaMessage = body(&event, value)?;
                let payload = base64::engine::general_purpose::STANDARD
                    .decode(msg.media.payload.as_bytes())?;
                Ok(AudioFrame::Media {
                    payload: Bytes::from(payload),
                    track: msg.media.track,
                    chunk: msg.media.chunk,
                    timestamp_ms: msg.media.timestamp,
                })
            }
            "stop" => {
                let msg: StopMessage = body(&event, value)?;
                Ok(AudioFrame::Stopped {
                    stream_sid: msg.stream_sid,
                })
            }
            _ => Ok(AudioFrame::Ignored { event }),
        }
    }

    /// Short tag for logging
    pub fn kind(&self) -> &str {
        match self {
            AudioFrame::Connected { .. } => "connected",
            AudioFrame::Started { .. } => "start",
            AudioFrame::Media { .. } => "media",
            AudioFrame::Stopped { .. } => "stop",
            AudioFrame::Ignored { event } => event,
        }
    }
}

fn body<T: DeserializeOwned>(event: &str, value: serde_json::Value) -> Result<T, FrameError> {
    serde_json::from_value(value).map_err(|e| FrameError::InvalidBody {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

impl MediaFormat {
    /// Whether the announced format is the one the transcriber was configured for
    pub fn matches(&self, encoding: AudioEncoding, sample_rate: u32) -> bool {
        let announced = match self.encoding.to_ascii_lowercase().as_str() {
            "audio/x-mulaw" | "audio/mulaw" | "audio/basic" | "pcm_mulaw" => {
                Some(AudioEncoding::PcmMulaw)
            }
            "audio/l16" | "audio/x-l16" | "pcm_s16le" => Some(AudioEncoding::PcmS16le),
            _ => None,
        };

        announced == Some(encoding) && self.sample_rate == sample_rate && self.channels == 1
    }
}
