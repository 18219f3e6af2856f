use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::infrastructure::notifications::{
    Connection, ConnectionError, ConnectionId, ConnectionState, NotificationHub,
};

/// Why an observer's read loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    PeerClosed,
    StreamEnded,
    ReadError(String),
    Cancelled,
}

/// A websocket observer. Payloads go into a bounded queue drained by the
/// session's writer task, so `send` never waits on the network.
#[derive(Debug)]
pub struct WsConnection {
    id: ConnectionId,
    outbound: mpsc::Sender<String>,
    state: Mutex<ConnectionState>,
    token: CancellationToken,
}

impl WsConnection {
    pub fn new(outbound: mpsc::Sender<String>, token: CancellationToken) -> Self {
        Self {
            id: ConnectionId::new(),
            outbound,
            state: Mutex::new(ConnectionState::Connecting),
            token,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves `Connecting` to `Active`. A closed connection stays closed.
    pub fn activate(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == ConnectionState::Connecting {
            *state = ConnectionState::Active;
            true
        } else {
            false
        }
    }
}

impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, payload: &str) -> Result<(), ConnectionError> {
        if self.state() == ConnectionState::Closed {
            return Err(ConnectionError::Closed);
        }
        self.outbound
            .try_send(payload.to_string())
            .map_err(|e| match e {
                TrySendError::Full(_) => ConnectionError::Backpressure,
                TrySendError::Closed(_) => ConnectionError::Closed,
            })
    }

    fn close(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = ConnectionState::Closed;
        self.token.cancel();
    }
}

/// Drains inbound frames until the peer goes away or `token` is cancelled.
///
/// Observers never send commands; inbound data only matters as a liveness
/// signal.
pub async fn watch_for_close<S, E>(mut inbound: S, token: &CancellationToken) -> CloseReason
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        tokio::select! {
            _ = token.cancelled() => return CloseReason::Cancelled,
            frame = inbound.next() => match frame {
                Some(Ok(Message::Close(_))) => return CloseReason::PeerClosed,
                Some(Ok(_)) => continue,
                Some(Err(e)) => return CloseReason::ReadError(e.to_string()),
                None => return CloseReason::StreamEnded,
            },
        }
    }
}

/// Runs one observer from upgrade to release.
pub async fn handle_socket(
    socket: WebSocket,
    hub: Arc<NotificationHub>,
    token: CancellationToken,
    buffer: usize,
) {
    let (mut sink, stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(buffer.max(1));
    let connection = Arc::new(WsConnection::new(tx, token.clone()));
    let id = connection.id();

    let writer_token = token.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_token.cancelled() => break,
                next = rx.recv() => match next {
                    Some(text) => {
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            warn!(connection_id = %id, "WebSocket write failed: {}", e);
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        // A dead writer ends the session as well.
        writer_token.cancel();
        let _ = sink.close().await;
    });

    hub.register(connection.clone());
    connection.activate();
    info!(connection_id = %id, "WebSocket observer connected");

    let reason = watch_for_close(stream, &token).await;
    match &reason {
        CloseReason::ReadError(e) => warn!(connection_id = %id, "WebSocket read error: {}", e),
        other => debug!(connection_id = %id, reason = ?other, "WebSocket read loop finished"),
    }

    hub.unregister(id);
    connection.close();
    let _ = writer.await;
    info!(connection_id = %id, "WebSocket observer disconnected");
}
