//! WebSocket Connection Handler
//!
//! Binds one upgraded connection to one hub subscriber. Two tasks run for
//! the connection's lifetime: a read watch that detects peer-initiated
//! close, and a write pump that forwards queued frames onto the wire with
//! a per-write deadline. Whichever observes termination first wins; the
//! other is aborted, and the subscriber is removed from the hub on every
//! exit path.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinError;

use super::hub::SubscriberHub;
use crate::server::AppState;

/// Why a connection ended.
///
/// Every termination, normal or not, is reported as a value to the caller;
/// nothing in per-connection handling may take down the process.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The HTTP→WebSocket upgrade never completed
    #[error("websocket handshake failed: {0}")]
    Handshake(axum::Error),

    /// A queued frame could not be written within the deadline
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The underlying socket write failed
    #[error("write failed: {0}")]
    WriteFailed(axum::Error),

    /// The peer closed the connection or the read side broke
    #[error("peer closed the connection")]
    PeerClosed,

    /// The connection's scope ended from our side
    #[error("connection cancelled")]
    Cancelled,
}

/// WebSocket upgrade handler for `GET /ws`.
///
/// A failed handshake is surfaced to the HTTP layer by axum and logged
/// here; no subscriber is registered until the upgrade has completed.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.hub);
    ws.on_failed_upgrade(|error| {
        tracing::warn!(error = %ConnectionError::Handshake(error), "WebSocket upgrade failed");
    })
    .on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Drive an established connection until it ends, then log the reason.
async fn handle_socket(socket: WebSocket, hub: Arc<SubscriberHub>) {
    let (id, queue) = match hub.register().await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting WebSocket connection");
            let mut socket = socket;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let write_timeout = hub.write_timeout();
    let (sink, stream) = socket.split();

    let mut pump = tokio::spawn(write_pump(sink, queue, write_timeout));
    let mut watch = tokio::spawn(read_watch(stream));

    // First task to finish decides the termination reason; the other is
    // aborted so it cannot touch the socket afterwards.
    let reason = tokio::select! {
        res = &mut pump => {
            watch.abort();
            flatten(res)
        }
        res = &mut watch => {
            pump.abort();
            flatten(res)
        }
    };

    hub.unregister(id).await;

    match reason {
        ConnectionError::PeerClosed | ConnectionError::Cancelled => {
            tracing::debug!(subscriber_id = %id, reason = %reason, "connection ended");
        }
        failure => {
            tracing::warn!(subscriber_id = %id, error = %failure, "connection failed");
        }
    }
}

/// A task that panicked or was aborted counts as a cancelled connection.
fn flatten(result: Result<ConnectionError, JoinError>) -> ConnectionError {
    result.unwrap_or(ConnectionError::Cancelled)
}

/// Forward queued frames to the socket until the queue closes or a write
/// fails.
///
/// Each write gets its own timeout scope, dropped when that write
/// resolves; nothing accumulates across a long-lived connection.
async fn write_pump<S>(
    mut sink: S,
    mut queue: mpsc::Receiver<Vec<u8>>,
    write_timeout: Duration,
) -> ConnectionError
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    while let Some(payload) = queue.recv().await {
        let frame = Message::Text(String::from_utf8_lossy(&payload).into_owned());
        match tokio::time::timeout(write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return ConnectionError::WriteFailed(e),
            Err(_) => return ConnectionError::WriteTimeout(write_timeout),
        }
    }

    // Queue sender gone: the hub no longer holds this subscriber
    ConnectionError::Cancelled
}

/// Drain incoming frames purely to detect the end of the connection.
///
/// Dashboard clients never send meaningful data; anything readable is
/// discarded, and a close frame, read error, or end of stream all mean the
/// peer is gone.
async fn read_watch<R>(mut stream: R) -> ConnectionError
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) | Err(_) => return ConnectionError::PeerClosed,
            Ok(_) => {}
        }
    }
    ConnectionError::PeerClosed
}
