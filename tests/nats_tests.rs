use call_transcriber::nats::messages::TranscriptMessage;
use call_transcriber::NatsClient;

#[test]
fn test_transcript_serialization() {
    let msg = TranscriptMessage {
        session_id: "call-1234".to_string(),
        text: "Hello world.".to_string(),
        partial: false,
        timestamp: "2025-10-27T14:30:05Z".to_string(),
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"session_id\":\"call-1234\""));
    assert!(json.contains("\"partial\":false"));

    let deserialized: TranscriptMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.session_id, "call-1234");
    assert_eq!(deserialized.text, "Hello world.");
    assert!(!deserialized.partial);
    assert_eq!(deserialized.timestamp, "2025-10-27T14:30:05Z");
}

#[test]
fn test_transcript_partial() {
    let json = r#"{
        "session_id": "call-1234",
        "text": "Hello wor",
        "partial": true,
        "timestamp": "2025-10-27T14:30:04Z"
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert!(msg.partial);
    assert_eq!(msg.text, "Hello wor");
}

#[test]
fn test_subject_per_transcript_kind() {
    assert_eq!(NatsClient::subject_for("stt.text", true), "stt.text.partial");
    assert_eq!(NatsClient::subject_for("stt.text", false), "stt.text.final");
    assert_eq!(NatsClient::subject_for("calls", false), "calls.final");
}
