//! WebSocket handler
//!
//! Handles the token check, the upgrade, and the per-connection reader and
//! writer tasks.

use super::remote_addr::resolve_remote_addr;
use super::response::ApiError;
use crate::broadcast::MessageRouter;
use crate::connection::ClientRecord;
use crate::liveness::spawn_monitor;
use crate::protocol::Frame;
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, CloseFrame, Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    http::{HeaderMap, Uri},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use relay_common::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Channel buffer size for outgoing frames
const MESSAGE_BUFFER_SIZE: usize = 100;

/// Upper bound on a single socket write
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket relay handler
///
/// GET /ws/<token>
pub async fn ws_handler(
    State(state): State<GatewayState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    uri: Uri,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let remote_addr = resolve_remote_addr(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    // Token check comes before any upgrade validation
    if !state.token_gate().validate_path(uri.path()) {
        tracing::info!(remote_addr = %remote_addr, "Unauthorized client");
        return ApiError::from(AppError::InvalidToken).into_response();
    }

    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_socket(state, socket, remote_addr))
            .into_response(),
        Err(rejection) => {
            tracing::debug!(remote_addr = %remote_addr, error = %rejection, "Upgrade rejected");
            rejection.into_response()
        }
    }
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, remote_addr: String) {
    // Create message channel for outgoing frames
    let (tx, rx) = mpsc::channel::<Frame>(MESSAGE_BUFFER_SIZE);

    // Register connection
    let record = state.registry().add(remote_addr, tx);

    tracing::info!(
        connection_id = %record.id(),
        remote_addr = %record.remote_addr(),
        total = state.registry().len(),
        "Client connected"
    );

    spawn_monitor(record.clone(), state.registry().clone(), state.keepalive());

    // Split the WebSocket
    let (ws_sink, ws_stream) = socket.split();

    let mut recv_task = tokio::spawn(recv_loop(state.router().clone(), record.clone(), ws_stream));
    let mut send_task = tokio::spawn(send_loop(record.clone(), rx, ws_sink));

    // Wait for either side to finish, then stop the other
    tokio::select! {
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %record.id(), "Receive task ended");
            send_task.abort();
        }
        _ = &mut send_task => {
            tracing::debug!(connection_id = %record.id(), "Send task ended");
            recv_task.abort();
        }
    }

    cleanup_connection(&state, &record);
}

/// Read frames from the socket and route them
async fn recv_loop(
    router: MessageRouter,
    record: Arc<ClientRecord>,
    mut stream: SplitStream<WebSocket>,
) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Binary(bytes)) => {
                router.dispatch(&record, Frame::from(bytes));
            }
            Ok(Message::Text(text)) => {
                router.dispatch(&record, Frame::from(text.into_bytes()));
            }
            Ok(Message::Ping(_)) => {
                tracing::trace!(connection_id = %record.id(), "Ping received");
                // Pong is handled automatically by axum
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!(connection_id = %record.id(), "Pong received");
            }
            Ok(Message::Close(frame)) => {
                tracing::debug!(
                    connection_id = %record.id(),
                    code = ?frame.as_ref().map(|f| f.code),
                    "Client closed connection"
                );
                return;
            }
            Err(e) => {
                tracing::debug!(connection_id = %record.id(), error = %e, "WebSocket error");
                return;
            }
        }
    }
}

/// Drain the outbound queue into the socket until closed
async fn send_loop(
    record: Arc<ClientRecord>,
    mut rx: mpsc::Receiver<Frame>,
    mut sink: SplitSink<WebSocket, Message>,
) {
    loop {
        tokio::select! {
            biased;

            code = record.closed() => {
                let close = Message::Close(Some(CloseFrame {
                    code: code.as_u16(),
                    reason: code.reason().into(),
                }));
                if timeout(WRITE_TIMEOUT, sink.send(close)).await.is_err() {
                    tracing::debug!(connection_id = %record.id(), "Close frame write timed out");
                }
                return;
            }
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    let _ = sink.close().await;
                    return;
                };

                // axum's Binary message owns its bytes, so each target gets a copy
                let message = Message::Binary(frame.as_bytes().to_vec());
                match timeout(WRITE_TIMEOUT, sink.send(message)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(
                            connection_id = %record.id(),
                            error = %e,
                            "Failed to write frame"
                        );
                        return;
                    }
                    Err(_) => {
                        tracing::warn!(connection_id = %record.id(), "Frame write timed out");
                        return;
                    }
                }
            }
        }
    }
}

/// Clean up a connection on disconnect
///
/// Safe to run after the heartbeat task already deregistered the connection.
fn cleanup_connection(state: &GatewayState, record: &Arc<ClientRecord>) {
    record.stop_monitor();
    state.registry().remove(record.id());

    let connected_secs = (Utc::now() - record.connected_at()).num_seconds();
    tracing::info!(
        connection_id = %record.id(),
        remote_addr = %record.remote_addr(),
        connected_secs,
        total = state.registry().len(),
        "Client disconnected"
    );
}
