use serde::{Deserialize, Deserializer};

/// Body of a `connected` message
#[derive(Debug, Default, Deserialize)]
pub struct ConnectedMessage {
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Body of a `start` message
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMessage {
    #[serde(default)]
    pub stream_sid: Option<String>,
    #[serde(default)]
    pub start: Option<StartMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub stream_sid: Option<String>,
    #[serde(default)]
    pub media_format: Option<MediaFormat>,
}

/// Audio format announced by the carrier in the `start` message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    /// MIME-style encoding name, e.g. `audio/x-mulaw`
    pub encoding: String,
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_channels() -> u16 {
    1
}

/// Body of a `media` message
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMessage {
    pub media: MediaPayload,
}

#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded audio bytes
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub chunk: Option<u64>,
    /// Milliseconds since the stream started
    #[serde(default, deserialize_with = "lenient_u64")]
    pub timestamp: Option<u64>,
}

/// Body of a `stop` message
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopMessage {
    #[serde(default)]
    pub stream_sid: Option<String>,
}

/// The carrier sends counters as decimal strings; accept numbers too.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
