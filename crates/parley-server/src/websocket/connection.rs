//! WebSocket connection handler
//!
//! Lifecycle: `Connecting -> Open -> Closing -> Closed`. Exactly one frame is
//! processed at a time, so a connection never has more than one upstream call
//! in flight.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::{IntoResponse, Response},
};
use parley_store::UserRef;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::websocket::registry::SessionHandle;

/// Sent instead of a reply when the upstream call fails
pub const ERROR_REPLY: &str = "Error processing request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// What to do with one inbound frame
enum Inbound {
    Input(String),
    Ignore,
    Close,
}

fn classify(message: Message) -> Inbound {
    match message {
        Message::Text(text) => Inbound::Input(text),
        Message::Binary(bytes) => Inbound::Input(String::from_utf8_lossy(&bytes).into_owned()),
        // tungstenite 自动回复 ping
        Message::Ping(_) | Message::Pong(_) => Inbound::Ignore,
        Message::Close(_) => Inbound::Close,
    }
}

/// WebSocket 处理器
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    user: Option<AuthUser>,
    ws: WebSocketUpgrade,
) -> Response {
    let requires_auth = state.config.get().read().await.auth.ws_requires_auth;

    let user_ref = if requires_auth {
        match user.as_ref().map(AuthUser::user_ref) {
            Some(Ok(user_ref)) => Some(user_ref),
            Some(Err(e)) => return e.into_response(),
            None => {
                debug!("rejecting unauthenticated websocket upgrade");
                return ApiError::Unauthorized.into_response();
            }
        }
    } else {
        None
    };

    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    debug!(peer = ?peer, state = %ConnectionState::Connecting, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer, user_ref))
}

/// Own one upgraded socket until it closes.
pub async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    peer: Option<SocketAddr>,
    user: Option<UserRef>,
) {
    let guard = state.registry.register(SessionHandle::new(peer));
    let span = info_span!("session", session_id = %guard.id());

    async move {
        info!(
            peer = ?peer,
            active_sessions = state.registry.len(),
            state = %ConnectionState::Open,
            "WebSocket connected"
        );

        run_loop(socket, &state, user.as_ref()).await;

        drop(guard);
        info!(
            active_sessions = state.registry.len(),
            state = %ConnectionState::Closed,
            "WebSocket disconnected"
        );
    }
    .instrument(span)
    .await
}

async fn run_loop(mut socket: WebSocket, state: &AppState, user: Option<&UserRef>) {
    loop {
        let message = match socket.recv().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                debug!(error = %e, "read failed");
                break;
            }
            None => break,
        };

        let input = match classify(message) {
            Inbound::Input(input) => input,
            Inbound::Ignore => continue,
            Inbound::Close => {
                debug!("close frame received");
                break;
            }
        };

        debug!(input_len = input.len(), "frame received");

        match state.completion.complete(&input).await {
            Ok(reply) => {
                if let Err(e) = socket.send(Message::Text(reply.clone())).await {
                    debug!(error = %e, "write failed");
                    break;
                }

                if let Err(e) = state.conversations.save(user, &input, &reply).await {
                    error!(error = %e, "failed to persist conversation");
                }
            }
            Err(e) => {
                warn!(error = %e, "AI service call failed");
                if let Err(e) = socket.send(Message::Text(ERROR_REPLY.to_string())).await {
                    debug!(error = %e, "write failed");
                    break;
                }
            }
        }
    }

    debug!(state = %ConnectionState::Closing, "closing socket");
    // 对端可能已断开，关闭失败无需处理
    let _ = socket.close().await;
}
