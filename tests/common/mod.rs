#![allow(dead_code)]

use anyhow::Result;
use bytes::Bytes;
use call_transcriber::{SinkNotice, Transcriber, TranscriberError, TranscriptEvent, TranscriptSink};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// What the session asked of the transcriber, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Subscribe,
    Connect,
    /// Handshake resolved successfully
    Connected,
    SendAudio(Vec<u8>),
    /// `send_audio` before the handshake resolved
    SendBeforeConnect(Vec<u8>),
    Close,
    /// `close` returned
    Closed,
}

/// Scripted transcriber: the test decides when `connect` and `close` resolve
/// and which events are emitted.
pub struct MockTranscriber {
    calls: Arc<Mutex<Vec<Call>>>,
    connect_gate: Option<oneshot::Receiver<Result<(), TranscriberError>>>,
    close_gate: Option<oneshot::Receiver<()>>,
    event_tx: Option<mpsc::UnboundedSender<TranscriptEvent>>,
    event_rx: Option<mpsc::UnboundedReceiver<TranscriptEvent>>,
    connected: bool,
}

/// Test-side controls for a [`MockTranscriber`]
pub struct MockHandle {
    pub calls: Arc<Mutex<Vec<Call>>>,
    connect_tx: Option<oneshot::Sender<Result<(), TranscriberError>>>,
    close_tx: Option<oneshot::Sender<()>>,
    event_tx: mpsc::UnboundedSender<TranscriptEvent>,
}

impl MockTranscriber {
    /// `connect` and `close` resolve immediately
    pub fn immediate() -> (Self, MockHandle) {
        Self::build(false, false)
    }

    /// `connect` waits for [`MockHandle::resolve_connect`]
    pub fn gated_connect() -> (Self, MockHandle) {
        Self::build(true, false)
    }

    /// `close` waits for [`MockHandle::release_close`]
    pub fn gated_close() -> (Self, MockHandle) {
        Self::build(false, true)
    }

    fn build(gate_connect: bool, gate_close: bool) -> (Self, MockHandle) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let (connect_tx, connect_rx) = if gate_connect {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let (close_tx, close_rx) = if gate_close {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let mock = Self {
            calls: Arc::clone(&calls),
            connect_gate: connect_rx,
            close_gate: close_rx,
            event_tx: Some(event_tx.clone()),
            event_rx: Some(event_rx),
            connected: false,
        };

        let handle = MockHandle {
            calls,
            connect_tx,
            close_tx,
            event_tx,
        };

        (mock, handle)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl Transcriber for MockTranscriber {
    fn subscribe(
        &mut self,
    ) -> Result<mpsc::UnboundedReceiver<TranscriptEvent>, TranscriberError> {
        self.record(Call::Subscribe);
        self.event_rx
            .take()
            .ok_or(TranscriberError::AlreadySubscribed)
    }

    async fn connect(&mut self) -> Result<(), TranscriberError> {
        self.record(Call::Connect);

        let result = match self.connect_gate.take() {
            Some(gate) => gate
                .await
                .unwrap_or_else(|_| Err(TranscriberError::ConnectFailure("gate dropped".into()))),
            None => Ok(()),
        };

        if result.is_ok() {
            self.connected = true;
            self.record(Call::Connected);
        }
        result
    }

    async fn send_audio(&mut self, audio: Bytes) -> Result<(), TranscriberError> {
        if self.connected {
            self.record(Call::SendAudio(audio.to_vec()));
            Ok(())
        } else {
            self.record(Call::SendBeforeConnect(audio.to_vec()));
            Err(TranscriberError::NotConnected)
        }
    }

    async fn close(&mut self) -> Result<(), TranscriberError> {
        self.record(Call::Close);
        if let Some(gate) = self.close_gate.take() {
            let _ = gate.await;
        }
        self.event_tx = None;
        self.record(Call::Closed);
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl MockHandle {
    pub fn resolve_connect(&mut self, result: Result<(), TranscriberError>) {
        if let Some(tx) = self.connect_tx.take() {
            let _ = tx.send(result);
        }
    }

    pub fn release_close(&mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn emit(&self, event: TranscriptEvent) {
        self.event_tx.send(event).unwrap();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Payloads passed to `send_audio` after the handshake, in order
    pub fn sent_audio(&self) -> Vec<Vec<u8>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendAudio(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }
}

/// Sink that remembers everything it receives
#[derive(Default)]
pub struct RecordingSink {
    pub emissions: Mutex<Vec<(String, bool)>>,
    pub notices: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn emissions(&self) -> Vec<(String, bool)> {
        self.emissions.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TranscriptSink for RecordingSink {
    async fn emit(&self, text: &str, is_final: bool) -> Result<()> {
        self.emissions
            .lock()
            .unwrap()
            .push((text.to_string(), is_final));
        Ok(())
    }

    async fn notify(&self, notice: SinkNotice) {
        let entry = match notice {
            SinkNotice::Opened => "opened".to_string(),
            SinkNotice::Closed => "closed".to_string(),
            SinkNotice::Error(e) => format!("error: {}", e),
        };
        self.notices.lock().unwrap().push(entry);
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Media message carrying `bytes`
pub fn media_message(bytes: &[u8]) -> String {
    use base64::Engine;
    format!(
        r#"{{"event":"media","media":{{"track":"inbound","payload":"{}"}}}}"#,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

pub const CONNECTED: &str = r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#;
pub const START: &str = r#"{"event":"start","start":{"streamSid":"MZ1","callSid":"CA1","mediaFormat":{"encoding":"audio/x-mulaw","sampleRate":8000,"channels":1}},"streamSid":"MZ1"}"#;
pub const STOP: &str = r#"{"event":"stop","stop":{"callSid":"CA1"},"streamSid":"MZ1"}"#;

/// Poll `cond` until it holds, failing the test after two seconds
pub async fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
