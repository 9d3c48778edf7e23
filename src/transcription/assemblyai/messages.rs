//! Wire messages for the AssemblyAI Universal Streaming (v3) websocket.
//!
//! Audio goes upstream as binary frames with no JSON wrapper; the only JSON
//! we send is [`TerminateMessage`].

use serde::{Deserialize, Serialize};

/// Session established
#[derive(Debug, Clone, Deserialize)]
pub struct BeginMessage {
    pub id: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Transcript for the current turn
#[derive(Debug, Clone, Deserialize)]
pub struct TurnMessage {
    #[serde(default)]
    pub turn_order: u32,
    pub transcript: String,
    pub end_of_turn: bool,
    #[serde(default)]
    pub turn_is_formatted: bool,
}

/// Session ended
#[derive(Debug, Clone, Deserialize)]
pub struct TerminationMessage {
    #[serde(default)]
    pub audio_duration_seconds: Option<f64>,
    #[serde(default)]
    pub session_duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub error_code: Option<String>,
    pub error: String,
}

/// Ask the service to flush and end the session
#[derive(Debug, Clone, Serialize)]
pub struct TerminateMessage {
    #[serde(rename = "type")]
    pub message_type: &'static str,
}

impl Default for TerminateMessage {
    fn default() -> Self {
        Self {
            message_type: "Terminate",
        }
    }
}

/// Any message received from the service
#[derive(Debug)]
pub enum AssemblyAiMessage {
    Begin(BeginMessage),
    Turn(TurnMessage),
    Termination(TerminationMessage),
    Error(ErrorMessage),
    /// Unknown `type`, kept for logging
    Unknown(String),
}

impl AssemblyAiMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        // Errors may arrive without a `type` tag
        if value.get("type").is_none() && value.get("error").is_some() {
            return Ok(Self::Error(serde_json::from_value(value)?));
        }

        match value.get("type").and_then(|t| t.as_str()) {
            Some("Begin") => Ok(Self::Begin(serde_json::from_value(value)?)),
            Some("Turn") => Ok(Self::Turn(serde_json::from_value(value)?)),
            Some("Termination") => Ok(Self::Termination(serde_json::from_value(value)?)),
            Some("Error") => Ok(Self::Error(serde_json::from_value(value)?)),
            _ => Ok(Self::Unknown(text.to_string())),
        }
    }
}

impl TurnMessage {
    /// Whether this turn closes an utterance.
    ///
    /// With formatting enabled the service sends the end-of-turn transcript
    /// twice, unformatted then formatted; only the formatted one is final.
    pub fn is_final(&self, format_turns: bool) -> bool {
        self.end_of_turn && (!format_turns || self.turn_is_formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_begin() {
        let msg = AssemblyAiMessage::parse(
            r#"{"type":"Begin","id":"abc-123","expires_at":1700000000}"#,
        )
        .unwrap();
        match msg {
            AssemblyAiMessage::Begin(begin) => assert_eq!(begin.id, "abc-123"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_turn_finality_with_formatting() {
        let unformatted: TurnMessage = serde_json::from_str(
            r#"{"turn_order":0,"transcript":"hello world","end_of_turn":true,"turn_is_formatted":false,"words":[]}"#,
        )
        .unwrap();
        let formatted: TurnMessage = serde_json::from_str(
            r#"{"turn_order":0,"transcript":"Hello world.","end_of_turn":true,"turn_is_formatted":true}"#,
        )
        .unwrap();

        assert!(!unformatted.is_final(true));
        assert!(unformatted.is_final(false));
        assert!(formatted.is_final(true));
    }

    #[test]
    fn test_parse_untagged_error() {
        let msg = AssemblyAiMessage::parse(r#"{"error":"Invalid API key"}"#).unwrap();
        assert!(matches!(msg, AssemblyAiMessage::Error(e) if e.error == "Invalid API key"));
    }

    #[test]
    fn test_parse_unknown() {
        let msg = AssemblyAiMessage::parse(r#"{"type":"SpeechStarted"}"#).unwrap();
        assert!(matches!(msg, AssemblyAiMessage::Unknown(_)));
    }

    #[test]
    fn test_terminate_serialization() {
        let json = serde_json::to_string(&TerminateMessage::default()).unwrap();
        assert_eq!(json, r#"{"type":"Terminate"}"#);
    }
}
