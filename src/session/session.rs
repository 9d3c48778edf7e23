use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};

use super::config::SessionConfig;
use super::gate::{Admission, AudioGate};
use super::stats::SessionStats;
use crate::error::{BridgeError, TranscriberError};
use crate::media::AudioFrame;
use crate::sink::{SinkNotice, TranscriptSink};
use crate::transcription::{Transcriber, TranscriptEvent};

type EventReceiver = mpsc::UnboundedReceiver<TranscriptEvent>;

/// Lifecycle of a call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Transcriber handshake in flight, or failed; audio is held or discarded
    Initializing,
    /// Handshake done, audio flowing
    Active,
    /// One side has ended the stream. A socket close abandons a pending
    /// handshake.
    Closing,
    /// Transcriber closed and socket gone
    Terminated,
}

/// What the run loop must do with the transcriber after an inbound message
#[derive(Debug)]
enum Action {
    None,
    Forward(Bytes),
    Close,
}

/// Bridges one media-stream socket to one transcriber.
///
/// The session owns the transcriber exclusively. Inbound messages and
/// transcriber events are handled on the single task running
/// [`run`](CallSession::run), so session state has one writer.
pub struct CallSession {
    transcriber: Box<dyn Transcriber>,
    bridge: Bridge,
}

/// Session state other than the transcriber, so it can be mutated while a
/// transcriber call is in flight.
struct Bridge {
    id: String,
    config: SessionConfig,
    sink: Arc<dyn TranscriptSink>,
    gate: AudioGate,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    started_at: DateTime<Utc>,
    stream_sid: Option<String>,
    call_sid: Option<String>,
    frames_received: usize,
    frames_forwarded: usize,
    frames_dropped: usize,
    malformed_frames: usize,
    partials_emitted: usize,
    finals_emitted: usize,
    upstream_errors: usize,
    stop_received: bool,
    connected: bool,
    transcriber_closed: bool,
}

impl CallSession {
    pub fn new(
        config: SessionConfig,
        transcriber: Box<dyn Transcriber>,
        sink: Arc<dyn TranscriptSink>,
    ) -> Self {
        Self::with_id(
            format!("call-{}", uuid::Uuid::new_v4()),
            config,
            transcriber,
            sink,
        )
    }

    pub fn with_id(
        id: impl Into<String>,
        config: SessionConfig,
        transcriber: Box<dyn Transcriber>,
        sink: Arc<dyn TranscriptSink>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Initializing);

        Self {
            transcriber,
            bridge: Bridge {
                id: id.into(),
                gate: AudioGate::new(config.max_pending_frames),
                config,
                sink,
                state: SessionState::Initializing,
                state_tx,
                started_at: Utc::now(),
                stream_sid: None,
                call_sid: None,
                frames_received: 0,
                frames_forwarded: 0,
                frames_dropped: 0,
                malformed_frames: 0,
                partials_emitted: 0,
                finals_emitted: 0,
                upstream_errors: 0,
                stop_received: false,
                connected: false,
                transcriber_closed: false,
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.bridge.id
    }

    /// Observe state transitions
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.bridge.state_tx.subscribe()
    }

    /// Drive the session until the inbound socket has closed and the
    /// transcriber has finished closing.
    ///
    /// `inbound` carries the socket's text messages; its end is the socket
    /// close.
    pub async fn run(self, inbound: mpsc::Receiver<String>) -> SessionStats {
        let span = info_span!("session", session_id = %self.bridge.id);
        self.run_inner(inbound).instrument(span).await
    }

    async fn run_inner(self, mut inbound: mpsc::Receiver<String>) -> SessionStats {
        let CallSession {
            mut transcriber,
            mut bridge,
        } = self;

        info!(
            "Session started (transcriber: {}, sink: {})",
            transcriber.name(),
            bridge.sink.name()
        );

        // Subscribe before connecting so no event can be missed
        let mut events = match transcriber.subscribe() {
            Ok(rx) => Some(rx),
            Err(e) => {
                warn!("Failed to subscribe to transcriber events: {}", e);
                None
            }
        };

        let mut inbound_open = true;

        // Initializing: hold audio until the handshake resolves. `None` means
        // the socket closed first and the handshake was abandoned.
        let handshake = if events.is_some() {
            let connect = connect_upstream(transcriber.as_mut(), bridge.config.connect_timeout);
            tokio::pin!(connect);

            loop {
                tokio::select! {
                    result = &mut connect => break Some(result),

                    message = inbound.recv() => match message {
                        Some(text) => {
                            if let Action::Close = bridge.on_message(&text) {
                                bridge.set_state(SessionState::Closing);
                            }
                        }
                        None => {
                            info!("Media stream socket closed during transcriber handshake");
                            inbound_open = false;
                            break None;
                        }
                    },

                    event = next_event(&mut events) => match event {
                        Some(event) => bridge.dispatch(event).await,
                        None => events = None,
                    },
                }
            }
        } else {
            Some(Err(TranscriberError::ConnectFailure(
                "transcriber event stream unavailable".to_string(),
            )))
        };

        match handshake {
            Some(Ok(())) => {
                info!("Transcriber connected");
                bridge.connected = true;
                if bridge.state == SessionState::Initializing {
                    bridge.set_state(SessionState::Active);
                }

                let held = bridge.gate.open();
                if !held.is_empty() {
                    debug!("Forwarding {} frames held during handshake", held.len());
                }
                for frame in held {
                    bridge.forward(transcriber.as_mut(), frame).await;
                }
            }
            Some(Err(e)) => {
                bridge.discard_held("failed handshake");
                bridge
                    .report(BridgeError::AdapterConnectFailure(e.to_string()))
                    .await;
            }
            None => {
                bridge.discard_held("abandoned handshake");
                bridge.set_state(SessionState::Closing);
            }
        }

        // A stop that arrived during the handshake closes now, after the
        // held audio went out
        if bridge.state == SessionState::Closing && inbound_open {
            bridge.close_transcriber(transcriber.as_mut(), &mut events).await;
        }

        // Active, and Closing while the socket stays open after a stop
        while inbound_open {
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(text) => match bridge.on_message(&text) {
                        Action::Forward(frame) => bridge.forward(transcriber.as_mut(), frame).await,
                        Action::Close => {
                            bridge.close_transcriber(transcriber.as_mut(), &mut events).await;
                        }
                        Action::None => {}
                    },
                    None => inbound_open = false,
                },

                event = next_event(&mut events) => match event {
                    Some(event) => bridge.dispatch(event).await,
                    None => events = None,
                },
            }
        }

        info!("Media stream socket disconnected");
        if !bridge.stop_received {
            info!("Stream ended without a stop message");
        }

        bridge.close_transcriber(transcriber.as_mut(), &mut events).await;

        // Events the transcriber emitted while closing
        if let Some(rx) = events.as_mut() {
            while let Ok(event) = rx.try_recv() {
                bridge.dispatch(event).await;
            }
        }

        bridge.set_state(SessionState::Terminated);

        let stats = bridge.stats();
        info!(
            "Session terminated: {} frames received, {} forwarded, {} dropped, {} malformed, {} partials, {} finals",
            stats.frames_received,
            stats.frames_forwarded,
            stats.frames_dropped,
            stats.malformed_frames,
            stats.partials_emitted,
            stats.finals_emitted
        );

        stats
    }
}

impl Bridge {
    /// Fail the gate, counting held frames as dropped
    fn discard_held(&mut self, cause: &str) {
        let discarded = self.gate.fail();
        self.frames_dropped += discarded;
        if discarded > 0 {
            warn!("Discarded {} frames held during {}", discarded, cause);
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("Session state {:?} -> {:?}", self.state, state);
            self.state = state;
            self.state_tx.send_replace(state);
        }
    }

    /// Decode and apply one inbound message. Never touches the transcriber.
    fn on_message(&mut self, text: &str) -> Action {
        let frame = match AudioFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.malformed_frames += 1;
                warn!("{}", BridgeError::from(&e));
                return Action::None;
            }
        };

        debug!("Inbound `{}` message", frame.kind());

        match frame {
            AudioFrame::Connected { protocol, version } => {
                info!(
                    "Media stream connected (protocol: {}, version: {})",
                    protocol.as_deref().unwrap_or("unknown"),
                    version.as_deref().unwrap_or("unknown")
                );
                Action::None
            }

            AudioFrame::Started {
                stream_sid,
                call_sid,
                media_format,
            } => {
                info!(
                    "Media stream started (stream: {}, call: {})",
                    stream_sid.as_deref().unwrap_or("unknown"),
                    call_sid.as_deref().unwrap_or("unknown")
                );

                if let Some(format) = media_format {
                    if !format.matches(self.config.encoding, self.config.sample_rate) {
                        warn!(
                            "Carrier announced {} at {} Hz ({} ch), transcriber expects {} at {} Hz",
                            format.encoding,
                            format.sample_rate,
                            format.channels,
                            self.config.encoding.as_str(),
                            self.config.sample_rate
                        );
                    }
                }

                self.stream_sid = stream_sid;
                self.call_sid = call_sid;
                Action::None
            }

            AudioFrame::Media { payload, .. } => {
                self.frames_received += 1;

                if matches!(self.state, SessionState::Closing | SessionState::Terminated) {
                    self.frames_dropped += 1;
                    debug!("Dropping media received after stream end");
                    return Action::None;
                }

                match self.gate.admit(payload) {
                    Admission::Forward(frame) => Action::Forward(frame),
                    Admission::Queued => Action::None,
                    Admission::Overflow => {
                        self.frames_dropped += 1;
                        warn!(
                            "Handshake queue full ({} frames), dropping media",
                            self.config.max_pending_frames
                        );
                        Action::None
                    }
                    Admission::Discarded => {
                        self.frames_dropped += 1;
                        Action::None
                    }
                }
            }

            AudioFrame::Stopped { .. } => {
                info!("Media stream stopped");
                self.stop_received = true;
                Action::Close
            }

            AudioFrame::Ignored { event } => {
                debug!("Ignoring `{}` message", event);
                Action::None
            }
        }
    }

    async fn forward(&mut self, transcriber: &mut dyn Transcriber, frame: Bytes) {
        match transcriber.send_audio(frame).await {
            Ok(()) => self.frames_forwarded += 1,
            Err(e) => {
                self.frames_dropped += 1;
                warn!("Failed to forward audio: {}", e);
            }
        }
    }

    /// Close the transcriber unless already closed, dispatching its events
    /// while waiting.
    async fn close_transcriber(
        &mut self,
        transcriber: &mut dyn Transcriber,
        events: &mut Option<EventReceiver>,
    ) {
        if self.transcriber_closed {
            return;
        }
        self.transcriber_closed = true;
        self.set_state(SessionState::Closing);

        let close = transcriber.close();
        tokio::pin!(close);

        let result = loop {
            tokio::select! {
                result = &mut close => break result,

                event = next_event(events) => match event {
                    Some(event) => self.dispatch(event).await,
                    None => *events = None,
                },
            }
        };

        match result {
            Ok(()) => info!("Transcriber closed"),
            Err(e) => {
                self.report(BridgeError::AdapterRuntimeError(e.to_string()))
                    .await
            }
        }
    }

    /// Route one transcriber event to the sink
    async fn dispatch(&mut self, event: TranscriptEvent) {
        if let Some((text, is_final)) = self.config.policy.select(&event) {
            match self.sink.emit(text, is_final).await {
                Ok(()) if is_final => self.finals_emitted += 1,
                Ok(()) => self.partials_emitted += 1,
                Err(e) => warn!("Sink {} failed to emit transcript: {}", self.sink.name(), e),
            }
            return;
        }

        match event {
            TranscriptEvent::Opened => self.sink.notify(SinkNotice::Opened).await,
            TranscriptEvent::Closed => self.sink.notify(SinkNotice::Closed).await,
            TranscriptEvent::Error(cause) => {
                self.upstream_errors += 1;
                self.report(BridgeError::AdapterRuntimeError(cause)).await;
            }
            TranscriptEvent::Partial(_) => debug!("Suppressed empty partial transcript"),
            TranscriptEvent::Final(_) => {}
        }
    }

    async fn report(&self, error: BridgeError) {
        self.sink.notify(SinkNotice::Error(error)).await;
    }

    fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            session_id: self.id.clone(),
            stream_sid: self.stream_sid.clone(),
            call_sid: self.call_sid.clone(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_received: self.frames_received,
            frames_forwarded: self.frames_forwarded,
            frames_dropped: self.frames_dropped,
            malformed_frames: self.malformed_frames,
            partials_emitted: self.partials_emitted,
            finals_emitted: self.finals_emitted,
            upstream_errors: self.upstream_errors,
            ended_without_stop: !self.stop_received,
            transcriber_connected: self.connected,
            state: self.state,
        }
    }
}

async fn connect_upstream(
    transcriber: &mut dyn Transcriber,
    limit: Option<Duration>,
) -> Result<(), TranscriberError> {
    match limit {
        Some(limit) => match timeout(limit, transcriber.connect()).await {
            Ok(result) => result,
            Err(_) => Err(TranscriberError::ConnectFailure(format!(
                "handshake timed out after {:?}",
                limit
            ))),
        },
        None => transcriber.connect().await,
    }
}

/// Next transcriber event; pends forever once the subscription is gone
async fn next_event(events: &mut Option<EventReceiver>) -> Option<TranscriptEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
