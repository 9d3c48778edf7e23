use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::state::AppState;
use super::twiml;
use crate::session::CallSession;
use crate::transcription::TranscriberFactory;

/// Inbound messages buffered between the socket and the session task
const INBOUND_CHANNEL_CAPACITY: usize = 1024;

/// GET /
/// Service banner
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, state.config.service.name.clone())
}

/// POST /
/// Voice webhook: tell the carrier to open a media stream back to this host
pub async fn call_webhook(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let host = match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => host,
        None => {
            warn!("Call webhook request without Host header");
            return (StatusCode::BAD_REQUEST, "Missing Host header").into_response();
        }
    };

    info!("Incoming call, streaming to {}{}", host, state.config.webhook.stream_path);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        twiml::stream_document(&state.config.webhook, host),
    )
        .into_response()
}

/// GET {stream_path}
/// Media-stream websocket, one call session per connection
pub async fn media_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_media_socket(socket, state))
}

async fn handle_media_socket(mut socket: WebSocket, state: AppState) {
    info!("Media stream websocket connected");

    let transcriber = match TranscriberFactory::create(&state.config.transcription) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to create transcriber: {}", e);
            return;
        }
    };

    let session_id = format!("call-{}", uuid::Uuid::new_v4());
    let sink = state.sinks.for_session(&session_id);
    let session = CallSession::with_id(session_id, state.config.session_config(), transcriber, sink);

    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(INBOUND_CHANNEL_CAPACITY);
    let session_task = tokio::spawn(session.run(inbound_rx));

    while let Some(message) = socket.recv().await {
        match message {
            Ok(Message::Text(text)) => {
                if inbound_tx.send(text).await.is_err() {
                    break;
                }
            }
            Ok(Message::Binary(data)) => {
                debug!("Ignoring {} byte binary message", data.len());
            }
            Ok(Message::Close(frame)) => {
                debug!("Media stream close frame: {:?}", frame);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Media stream websocket error: {}", e);
                break;
            }
        }
    }

    // Socket gone: the session tears down once it sees the channel end
    drop(inbound_tx);

    match session_task.await {
        Ok(stats) => info!(
            "Media stream websocket disconnected (session {}, {:.1}s)",
            stats.session_id, stats.duration_secs
        ),
        Err(e) => error!("Session task panicked: {}", e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
