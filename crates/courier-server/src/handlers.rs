//! Connection handlers for Courier server.
//!
//! This module handles the handshake, the per-connection socket loop and
//! the translation between WebSocket frames and hub events.

use crate::auth::JwtValidator;
use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::BytesMut;
use courier_core::{ConnectionHandle, Handled, Hub, Identity, MemoryStore, Outbound};
use courier_protocol::{codec, ClientEvent, Encoding, ProtocolError, ServerEvent, SessionReady};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Close code sent when a connection idles past the heartbeat timeout.
const CLOSE_IDLE: u16 = 4001;

type WsSender = SplitSink<WebSocket, Message>;

/// Shared server state.
pub struct AppState {
    /// The messaging hub.
    pub hub: Hub,
    /// Users and messages.
    pub store: Arc<MemoryStore>,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    ///
    /// # Errors
    ///
    /// Returns an error if the seeded user roster is invalid.
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(MemoryStore::with_users(config.seed_users()?));
        let validator = Arc::new(JwtValidator::new(
            config.auth.jwt_secret.as_bytes(),
            store.clone(),
        ));
        let hub = Hub::new(store.clone(), store.clone(), validator, config.hub_config());

        Ok(Self { hub, store, config })
    }
}

/// Query parameters accepted on the WebSocket and roster endpoints.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    /// Bearer token, as an alternative to the `Authorization` header.
    pub token: Option<String>,
    /// Encoding the server replies with.
    #[serde(default)]
    pub format: Encoding,
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    let path = state.config.transport.websocket_path.clone();
    Router::new()
        .route(&path, get(ws_handler))
        .route("/health", get(health_handler))
        .route("/users", get(users_handler))
        .with_state(state)
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Courier server listening on {}", addr);
    info!(
        "WebSocket endpoint: ws://{}{}",
        addr, config.transport.websocket_path
    );

    serve(listener, Arc::new(AppState::new(config)?)).await
}

/// Serve requests on an already bound listener.
///
/// # Errors
///
/// Returns an error if the server stops with an I/O failure.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.hub.stats().connection_count,
    }))
}

/// Roster handler: every user but the caller, with presence and the last
/// message exchanged with them.
async fn users_handler(
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let token = params.token.or_else(|| bearer_token(&headers));
    let identity = match state.hub.authenticate(token.as_deref()).await {
        Ok(identity) => identity,
        Err(e) => {
            debug!(error = %e, "Roster request rejected");
            metrics::record_error("authentication");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Authentication error" })),
            )
                .into_response();
        }
    };

    match state.hub.roster(&identity.user_id).await {
        Ok(roster) => Json(roster).into_response(),
        Err(e) => {
            error!(user = %identity.user_id, error = %e, "Failed to load roster");
            metrics::record_error("persistence");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

/// WebSocket upgrade handler.
///
/// Authentication happens before the upgrade; a rejected handshake never
/// opens a socket.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    if state.hub.registry().len() >= state.config.limits.max_connections {
        warn!("Connection limit reached");
        metrics::record_error("capacity");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "Server at capacity" })),
        )
            .into_response();
    }

    let token = params.token.or_else(|| bearer_token(&headers));
    let identity = match state.hub.authenticate(token.as_deref()).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "Handshake rejected");
            metrics::record_error("authentication");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Authentication error" })),
            )
                .into_response();
        }
    };

    let format = params.format;
    ws.max_message_size(state.config.limits.max_message_size)
        .on_upgrade(move |socket| handle_websocket(socket, state, identity, format))
}

/// Extract the token from an `Authorization: Bearer` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

/// Handle a WebSocket connection.
async fn handle_websocket(
    socket: WebSocket,
    state: Arc<AppState>,
    identity: Identity,
    format: Encoding,
) {
    // Record connection metrics
    let _metrics_guard = ConnectionMetricsGuard::new();

    let (handle, mut outbound) = ConnectionHandle::new(identity);
    let connection = handle.id().clone();
    let heartbeat = state.config.heartbeat.clone();

    debug!(connection = %connection, user = %handle.user_id(), ?format, "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();

    let ready = ServerEvent::SessionReady(SessionReady {
        user_id: handle.user_id().clone(),
        username: handle.username().to_string(),
        connection_id: connection.to_string(),
        heartbeat_ms: heartbeat.interval_ms,
    });
    if let Err(e) = send_event(&mut sender, &ready, format).await {
        error!(connection = %connection, error = %e, "Failed to send session:ready");
        return;
    }

    state.hub.connect(handle.clone()).await;
    metrics::set_users_online(state.hub.registry().len());

    // Read buffer for partial binary frames
    let mut read_buffer = BytesMut::with_capacity(4096);

    let mut ping = tokio::time::interval(Duration::from_millis(heartbeat.interval_ms.max(1)));
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;

    let idle_timeout = Duration::from_millis(heartbeat.timeout_ms);
    let mut last_seen = Instant::now();

    loop {
        let idle = tokio::time::sleep_until(last_seen + idle_timeout);

        tokio::select! {
            biased;

            // Events queued for this connection by the hub
            Some(out) = outbound.recv() => match out {
                Outbound::Event(event) => {
                    if let Err(e) = send_event(&mut sender, &event, format).await {
                        debug!(connection = %connection, error = %e, "Send failed");
                        break;
                    }
                }
                Outbound::Close { code, reason } => {
                    debug!(connection = %connection, code, reason, "Closing connection");
                    close(&mut sender, code, reason).await;
                    break;
                }
            },

            // Receive from WebSocket
            msg = receiver.next() => {
                last_seen = Instant::now();
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match codec::decode_json::<ClientEvent>(&text) {
                            Ok(event) => dispatch(&state, &handle, event, text.len()).await,
                            Err(e) => reject_frame(&handle, &e),
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        read_buffer.extend_from_slice(&data);

                        for frame in decode_frames(&mut read_buffer) {
                            match frame {
                                Ok((event, bytes)) => {
                                    dispatch(&state, &handle, event, bytes).await;
                                }
                                Err(e) => reject_frame(&handle, &e),
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Liveness only
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection = %connection, "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(connection = %connection, error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                    None => {
                        debug!(connection = %connection, "WebSocket stream ended");
                        break;
                    }
                }
            }

            _ = ping.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            () = idle => {
                info!(connection = %connection, user = %handle.user_id(), "Idle timeout");
                metrics::record_error("idle_timeout");
                close(&mut sender, CLOSE_IDLE, "idle timeout").await;
                break;
            }
        }
    }

    state.hub.disconnect(&handle).await;
    metrics::set_users_online(state.hub.registry().len());

    debug!(connection = %connection, "WebSocket disconnected");
}

/// Decode every complete binary frame in `buf`, pairing each event with
/// its encoded size.
///
/// A frame that fails to deserialize is consumed on its own. An oversized
/// length prefix leaves no frame boundary to resume from, so the buffer is
/// discarded.
fn decode_frames(buf: &mut BytesMut) -> Vec<Result<(ClientEvent, usize), ProtocolError>> {
    let mut frames = Vec::new();

    loop {
        let before = buf.len();
        match codec::decode_from::<ClientEvent>(buf) {
            Ok(Some(event)) => frames.push(Ok((event, before - buf.len()))),
            Ok(None) => break,
            Err(e) => {
                let oversized = matches!(e, ProtocolError::FrameTooLarge(_));
                frames.push(Err(e));
                if oversized {
                    buf.clear();
                    break;
                }
            }
        }
    }

    frames
}

/// Hand a decoded client event to the hub.
async fn dispatch(state: &AppState, handle: &ConnectionHandle, event: ClientEvent, bytes: usize) {
    let start = std::time::Instant::now();
    metrics::record_event(event.name(), bytes, "inbound");

    match state.hub.handle_event(handle, event).await {
        Ok(Handled::Sent(_)) => metrics::record_message_persisted(),
        Ok(Handled::Read(Some(_))) => metrics::record_read_receipt(),
        Ok(_) => {}
        Err(e) => metrics::record_error(e.kind()),
    }

    metrics::record_latency(start.elapsed().as_secs_f64());
}

/// Report an undecodable frame to its sender.
fn reject_frame(handle: &ConnectionHandle, e: &ProtocolError) {
    debug!(connection = %handle.id(), error = %e, "Malformed frame");
    metrics::record_error("decode");
    handle.send(ServerEvent::error("Malformed event"));
}

/// Send an event in the connection's encoding.
async fn send_event(sender: &mut WsSender, event: &ServerEvent, format: Encoding) -> Result<()> {
    let (message, len) = match format {
        Encoding::Json => {
            let text = codec::encode_json(event)?;
            let len = text.len();
            (Message::Text(text), len)
        }
        Encoding::MsgPack => {
            let data = codec::encode_binary(event)?;
            (Message::Binary(data.to_vec()), data.len())
        }
    };

    metrics::record_event(event.name(), len, "outbound");
    sender.send(message).await?;
    Ok(())
}

async fn close(sender: &mut WsSender, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    if let Err(e) = sender.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "Close frame not delivered");
    }
}
