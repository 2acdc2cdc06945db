//! Admission/Upgrade Front — the single HTTP surface: the `/` WebSocket
//! upgrade plus `/health` and `/metrics`. Admission checks (ban table,
//! connection-flood window) run before the upgrade completes; everything
//! after that is handed to a per-connection task.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::error::RouterError;
use crate::state::AppState;
use crate::wire::{self, ClientMessage, ServerMessage};

static PROCESS_START: std::sync::LazyLock<Instant> = std::sync::LazyLock::new(Instant::now);

pub fn build_router(state: Arc<AppState>) -> Router {
    std::sync::LazyLock::force(&PROCESS_START);

    Router::new()
        .route("/", get(upgrade_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn client_ip(headers: &HeaderMap, socket_addr: SocketAddr) -> IpAddr {
    let from_header = |name: &str| -> Option<IpAddr> {
        headers
            .get(name)?
            .to_str()
            .ok()?
            .split(',')
            .next()?
            .trim()
            .parse()
            .ok()
    };

    from_header("x-forwarded-for")
        .or_else(|| from_header("x-real-ip"))
        .unwrap_or(socket_addr.ip())
}

async fn upgrade_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ConnectInfo(socket_addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    let ip = client_ip(&headers, socket_addr);

    if state.security.is_ip_banned(ip) {
        warn!(%ip, "rejected upgrade: banned");
        return (StatusCode::FORBIDDEN, "banned").into_response();
    }
    if !state.security.track_ip_connection(ip) {
        warn!(%ip, "rejected upgrade: connection flood");
        return (StatusCode::TOO_MANY_REQUESTS, "rate limited").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, ip))
}

/// Per-connection task: a dedicated send task forwards queued
/// [`ServerMessage`]s and out-of-band ping/close signals to the socket,
/// while this task's own loop reads frames and hands them to the router.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, ip: IpAddr) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let (close_tx, mut close_rx) = mpsc::unbounded_channel::<()>();
    let (ping_tx, mut ping_rx) = mpsc::unbounded_channel::<()>();

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(message) = out_rx.recv() => {
                    let Ok(json) = serde_json::to_string(&message) else { continue };
                    if ws_tx.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Some(()) = ping_rx.recv() => {
                    if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
                _ = close_rx.recv() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
                else => break,
            }
        }
    });

    let mut current_user: Option<String> = None;

    while let Some(frame) = ws_rx.next().await {
        let raw = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                if let Some(user_id) = &current_user {
                    state.connections.touch(user_id);
                }
                continue;
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
        };

        if raw.len() > state.config.max_message_size {
            let _ = out_tx.send(ServerMessage::Error {
                message: RouterError::FrameTooLarge.client_message(),
            });
            continue;
        }

        // Only a frame that isn't even valid JSON closes the transport. An
        // unknown `type` or a known type missing a required field both get
        // an `error` reply and the connection stays open.
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                debug!(error = %err, "malformed frame");
                let router_err = RouterError::MalformedJson;
                let _ = out_tx.send(ServerMessage::Error {
                    message: router_err.client_message(),
                });
                if router_err.close_transport() {
                    break;
                }
                continue;
            }
        };

        let type_name = value.get("type").and_then(Value::as_str).map(str::to_string);
        let message = match type_name {
            None => {
                let _ = out_tx.send(ServerMessage::Error {
                    message: RouterError::MissingField("type".to_string()).client_message(),
                });
                continue;
            }
            Some(t) if !wire::KNOWN_TYPES.contains(&t.as_str()) => {
                debug!(type_name = %t, "unknown frame type");
                let _ = out_tx.send(ServerMessage::Error {
                    message: RouterError::UnknownType(t).client_message(),
                });
                continue;
            }
            Some(_) => match serde_json::from_value::<ClientMessage>(value) {
                Ok(message) => message,
                Err(err) => {
                    let _ = out_tx.send(ServerMessage::Error {
                        message: RouterError::MissingField(missing_field(&err)).client_message(),
                    });
                    continue;
                }
            },
        };

        if let Some(user_id) = &current_user {
            state.connections.touch(user_id);
        }

        if let ClientMessage::Identify { user_id, .. } = &message {
            bind_connection(&state, &mut current_user, user_id, &out_tx, &close_tx, &ping_tx, ip);
        }

        crate::router::route(&state, message);
    }

    send_task.abort();

    if let Some(user_id) = current_user {
        state.connections.remove_connection(&user_id);
        crate::handlers::handle_disconnect(&state, &user_id);
    }
}

/// Binds a freshly-identified socket into the Connection Manager. If the
/// user id was already connected (re-identify), the prior handle is
/// replaced and its close channel signaled so the old task unwinds.
#[allow(clippy::too_many_arguments)]
fn bind_connection(
    state: &AppState,
    current_user: &mut Option<String>,
    user_id: &str,
    out_tx: &mpsc::UnboundedSender<ServerMessage>,
    close_tx: &mpsc::UnboundedSender<()>,
    ping_tx: &mpsc::UnboundedSender<()>,
    ip: IpAddr,
) {
    if let Some(previous) = state.connections.add_connection(
        user_id.to_string(),
        out_tx.clone(),
        close_tx.clone(),
        ping_tx.clone(),
        ip,
    ) {
        let _ = previous.close.send(());
    }
    *current_user = Some(user_id.to_string());
    info!(user_id, %ip, "connection identified");
}

/// Pulls the field name out of a serde_json "missing field `x`" error.
/// Falls back to the full message if the shape doesn't match, which only
/// happens for a type-mismatch rather than a truly missing field.
fn missing_field(err: &serde_json::Error) -> String {
    let msg = err.to_string();
    msg.split('`')
        .nth(1)
        .map(str::to_string)
        .unwrap_or(msg)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    connections: usize,
    queue_depth_text: usize,
    queue_depth_video: usize,
    queue_depth_voice: usize,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "ok",
        uptime_secs: crate::clock::elapsed_since(*PROCESS_START).as_secs(),
        connections: state.connections.connection_count(),
        queue_depth_text: state.queue.len_for_mode(crate::queue::Mode::Text),
        queue_depth_video: state.queue.len_for_mode(crate::queue::Mode::Video),
        queue_depth_voice: state.queue.len_for_mode(crate::queue::Mode::Voice),
    })
}

async fn metrics_handler() -> String {
    crate::metrics::gather()
}
