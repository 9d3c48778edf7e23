use bytes::{Bytes, BytesMut};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use super::messages::{AssemblyAiMessage, TerminateMessage};
use crate::error::TranscriberError;
use crate::transcription::{Transcriber, TranscriberConfig, TranscriptEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// How long `close` waits for the service to flush its last transcripts
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on `close` as a whole, including the drain
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Audio chunks waiting for the connection task
const AUDIO_CHANNEL_CAPACITY: usize = 64;

/// AssemblyAI Universal Streaming client
///
/// `connect` resolves once the service has sent `Begin`. From then on a
/// spawned task owns the websocket: it batches outgoing audio into chunks of
/// at least `min_chunk_ms`, and turns incoming messages into
/// [`TranscriptEvent`]s.
pub struct AssemblyAiTranscriber {
    config: TranscriberConfig,
    event_tx: Option<mpsc::UnboundedSender<TranscriptEvent>>,
    event_rx: Option<mpsc::UnboundedReceiver<TranscriptEvent>>,
    audio_tx: Option<mpsc::Sender<Bytes>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    connection_handle: Option<JoinHandle<()>>,
    session_id: Option<String>,
}

impl AssemblyAiTranscriber {
    pub fn new(config: TranscriberConfig) -> Result<Self, TranscriberError> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            event_tx: Some(event_tx),
            event_rx: Some(event_rx),
            audio_tx: None,
            shutdown_tx: None,
            connection_handle: None,
            session_id: None,
        })
    }

    /// Upstream session id, once connected
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Streaming endpoint with the audio format in the query string
    pub fn websocket_url(config: &TranscriberConfig) -> Result<Url, TranscriberError> {
        let mut url = Url::parse(&config.base_url)
            .and_then(|base| base.join("/v3/ws"))
            .map_err(|e| {
                TranscriberError::Configuration(format!(
                    "invalid base URL {}: {}",
                    config.base_url, e
                ))
            })?;

        url.query_pairs_mut()
            .append_pair("sample_rate", &config.sample_rate.to_string())
            .append_pair("encoding", config.encoding.as_str())
            .append_pair(
                "format_turns",
                if config.format_turns { "true" } else { "false" },
            );

        Ok(url)
    }

    /// Read until `Begin`. Anything else before it is logged and skipped.
    async fn await_begin(source: &mut WsSource) -> Result<String, TranscriberError> {
        while let Some(message) = source.next().await {
            let message = message.map_err(|e| {
                TranscriberError::ConnectFailure(format!("websocket error during handshake: {e}"))
            })?;

            match message {
                Message::Text(text) => match AssemblyAiMessage::parse(&text) {
                    Ok(AssemblyAiMessage::Begin(begin)) => {
                        info!(
                            "AssemblyAI session started: {} (expires at: {:?})",
                            begin.id, begin.expires_at
                        );
                        return Ok(begin.id);
                    }
                    Ok(AssemblyAiMessage::Error(err)) => {
                        return Err(TranscriberError::ConnectFailure(describe_error(
                            err.error_code.as_deref(),
                            &err.error,
                        )));
                    }
                    Ok(other) => debug!("Ignoring message before Begin: {:?}", other),
                    Err(e) => warn!("Failed to parse AssemblyAI message: {}", e),
                },
                Message::Close(frame) => {
                    return Err(TranscriberError::ConnectFailure(format!(
                        "connection closed before session began: {:?}",
                        frame
                    )));
                }
                _ => {}
            }
        }

        Err(TranscriberError::ConnectFailure(
            "connection ended before session began".to_string(),
        ))
    }
}

#[async_trait::async_trait]
impl Transcriber for AssemblyAiTranscriber {
    fn subscribe(
        &mut self,
    ) -> Result<mpsc::UnboundedReceiver<TranscriptEvent>, TranscriberError> {
        self.event_rx
            .take()
            .ok_or(TranscriberError::AlreadySubscribed)
    }

    async fn connect(&mut self) -> Result<(), TranscriberError> {
        let event_tx = self
            .event_tx
            .clone()
            .ok_or_else(|| TranscriberError::ConnectFailure("transcriber already closed".into()))?;

        let url = Self::websocket_url(&self.config)?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TranscriberError::ConnectFailure(format!("invalid request: {e}")))?;

        // Raw API key, no Bearer prefix
        let auth = HeaderValue::from_str(&self.config.api_key)
            .map_err(|e| TranscriberError::Configuration(format!("invalid API key: {e}")))?;
        request.headers_mut().insert("Authorization", auth);

        info!("Connecting to AssemblyAI at {}", url);

        let (ws_stream, _response) = connect_async(request)
            .await
            .map_err(|e| TranscriberError::ConnectFailure(e.to_string()))?;

        let (sink, mut source) = ws_stream.split();

        let session_id = Self::await_begin(&mut source).await?;
        self.session_id = Some(session_id);

        let _ = event_tx.send(TranscriptEvent::Opened);

        let (audio_tx, audio_rx) = mpsc::channel::<Bytes>(AUDIO_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let connection = Connection {
            sink,
            source,
            event_tx,
            format_turns: self.config.format_turns,
            min_chunk_bytes: self.config.min_chunk_bytes().max(1),
            pending: BytesMut::new(),
        };

        self.audio_tx = Some(audio_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.connection_handle = Some(tokio::spawn(connection.run(audio_rx, shutdown_rx)));

        Ok(())
    }

    async fn send_audio(&mut self, audio: Bytes) -> Result<(), TranscriberError> {
        let audio_tx = self.audio_tx.as_ref().ok_or(TranscriberError::NotConnected)?;

        audio_tx
            .send(audio)
            .await
            .map_err(|_| TranscriberError::Send("upstream connection has ended".to_string()))
    }

    async fn close(&mut self) -> Result<(), TranscriberError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        self.audio_tx = None;

        if let Some(mut handle) = self.connection_handle.take() {
            if timeout(CLOSE_TIMEOUT, &mut handle).await.is_err() {
                warn!("AssemblyAI connection did not close in time, aborting");
                handle.abort();
            }
        }

        // Ends the subscription once the connection task's clone is gone
        self.event_tx = None;

        info!("AssemblyAI transcriber closed");
        Ok(())
    }

    fn name(&self) -> &str {
        "assemblyai"
    }
}

impl Drop for AssemblyAiTranscriber {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

enum Exit {
    /// Local side asked to stop; terminate gracefully
    Shutdown,
    /// Service ended the session or the socket failed
    Upstream,
}

/// Websocket owned by the connection task
struct Connection {
    sink: WsSink,
    source: WsSource,
    event_tx: mpsc::UnboundedSender<TranscriptEvent>,
    format_turns: bool,
    min_chunk_bytes: usize,
    pending: BytesMut,
}

impl Connection {
    async fn run(
        mut self,
        mut audio_rx: mpsc::Receiver<Bytes>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let exit = loop {
            tokio::select! {
                // Queued audio goes out before a shutdown is honoured
                biased;

                audio = audio_rx.recv() => match audio {
                    Some(chunk) => {
                        if let Err(e) = self.buffer_audio(&chunk).await {
                            self.emit(TranscriptEvent::Error(e.to_string()));
                            break Exit::Upstream;
                        }
                    }
                    None => break Exit::Shutdown,
                },

                message = self.source.next() => match message {
                    Some(Ok(message)) => {
                        if !self.handle_message(message) {
                            break Exit::Upstream;
                        }
                    }
                    Some(Err(e)) => {
                        error!("AssemblyAI websocket error: {}", e);
                        self.emit(TranscriptEvent::Error(format!("websocket error: {e}")));
                        break Exit::Upstream;
                    }
                    None => {
                        info!("AssemblyAI websocket stream ended");
                        break Exit::Upstream;
                    }
                },

                _ = &mut shutdown_rx => break Exit::Shutdown,
            }
        };

        if let Exit::Shutdown = exit {
            while let Ok(chunk) = audio_rx.try_recv() {
                self.pending.extend_from_slice(&chunk);
            }
            self.terminate().await;
        }

        self.emit(TranscriptEvent::Closed);
        info!("AssemblyAI connection closed");
    }

    /// Buffer audio and send once a full chunk is available
    async fn buffer_audio(&mut self, chunk: &[u8]) -> Result<(), TranscriberError> {
        self.pending.extend_from_slice(chunk);

        if self.pending.len() >= self.min_chunk_bytes {
            self.flush().await?;
        }

        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TranscriberError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let data = self.pending.split().freeze();
        let len = data.len();

        self.sink
            .send(Message::Binary(data.to_vec()))
            .await
            .map_err(|e| TranscriberError::Send(format!("failed to send audio: {e}")))?;

        debug!("Sent {} bytes of audio to AssemblyAI", len);
        Ok(())
    }

    /// Flush, send `Terminate`, and collect transcripts until the service
    /// confirms termination or the drain times out.
    async fn terminate(&mut self) {
        if let Err(e) = self.flush().await {
            warn!("Failed to flush trailing audio: {}", e);
        }

        match serde_json::to_string(&TerminateMessage::default()) {
            Ok(json) => {
                if let Err(e) = self.sink.send(Message::Text(json)).await {
                    warn!("Failed to send Terminate: {}", e);
                    return;
                }
            }
            Err(e) => {
                warn!("Failed to serialize Terminate: {}", e);
                return;
            }
        }

        let drain = async {
            while let Some(Ok(message)) = self.source.next().await {
                if !self.handle_message(message) {
                    break;
                }
            }
        };

        if timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("Timed out waiting for AssemblyAI termination");
        }

        let _ = self.sink.send(Message::Close(None)).await;
    }

    /// Returns false once the session is over
    fn handle_message(&self, message: Message) -> bool {
        match message {
            Message::Text(text) => match AssemblyAiMessage::parse(&text) {
                Ok(AssemblyAiMessage::Turn(turn)) => {
                    let event = if turn.is_final(self.format_turns) {
                        TranscriptEvent::Final(turn.transcript)
                    } else {
                        TranscriptEvent::Partial(turn.transcript)
                    };
                    self.emit(event);
                }
                Ok(AssemblyAiMessage::Termination(term)) => {
                    info!(
                        "AssemblyAI session terminated (audio: {:?}s, session: {:?}s)",
                        term.audio_duration_seconds, term.session_duration_seconds
                    );
                    return false;
                }
                Ok(AssemblyAiMessage::Error(err)) => {
                    let cause = describe_error(err.error_code.as_deref(), &err.error);
                    error!("AssemblyAI error: {}", cause);
                    self.emit(TranscriptEvent::Error(cause));
                }
                Ok(AssemblyAiMessage::Begin(begin)) => {
                    debug!("Unexpected second Begin: {}", begin.id);
                }
                Ok(AssemblyAiMessage::Unknown(raw)) => {
                    debug!("Unknown AssemblyAI message: {}", raw);
                }
                Err(e) => warn!("Failed to parse AssemblyAI message: {}", e),
            },
            Message::Close(frame) => {
                info!("AssemblyAI websocket closed: {:?}", frame);
                return false;
            }
            _ => {}
        }

        true
    }

    fn emit(&self, event: TranscriptEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("Transcript event dropped, no subscriber");
        }
    }
}

fn describe_error(code: Option<&str>, error: &str) -> String {
    match code {
        Some(code) => format!("{error} ({code})"),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::AudioEncoding;

    fn config() -> TranscriberConfig {
        TranscriberConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_websocket_url() {
        let url = AssemblyAiTranscriber::websocket_url(&config()).unwrap();
        let url = url.as_str();

        assert!(url.starts_with("wss://streaming.assemblyai.com/v3/ws?"));
        assert!(url.contains("sample_rate=8000"));
        assert!(url.contains("encoding=pcm_mulaw"));
        assert!(url.contains("format_turns=true"));
    }

    #[test]
    fn test_websocket_url_custom_base() {
        let config = TranscriberConfig {
            base_url: "ws://127.0.0.1:9000".to_string(),
            encoding: AudioEncoding::PcmS16le,
            sample_rate: 16000,
            format_turns: false,
            ..config()
        };

        let url = AssemblyAiTranscriber::websocket_url(&config).unwrap();
        assert_eq!(
            url.as_str(),
            "ws://127.0.0.1:9000/v3/ws?sample_rate=16000&encoding=pcm_s16le&format_turns=false"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = TranscriberConfig {
            base_url: "not a url".to_string(),
            ..config()
        };
        assert!(matches!(
            AssemblyAiTranscriber::websocket_url(&config),
            Err(TranscriberError::Configuration(_))
        ));
    }

    #[test]
    fn test_subscribe_once() {
        let mut transcriber = AssemblyAiTranscriber::new(config()).unwrap();
        assert!(transcriber.subscribe().is_ok());
        assert!(matches!(
            transcriber.subscribe(),
            Err(TranscriberError::AlreadySubscribed)
        ));
    }

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let mut transcriber = AssemblyAiTranscriber::new(config()).unwrap();
        let err = transcriber
            .send_audio(Bytes::from_static(&[0xFF]))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriberError::NotConnected));
    }

    #[tokio::test]
    async fn test_close_without_connect_ends_subscription() {
        let mut transcriber = AssemblyAiTranscriber::new(config()).unwrap();
        let mut events = transcriber.subscribe().unwrap();

        transcriber.close().await.unwrap();
        // Second close is a no-op
        transcriber.close().await.unwrap();

        assert_eq!(events.recv().await, None);
    }
}
