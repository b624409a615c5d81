//! Individual relay connection
//!
//! A `ClientRecord` is everything the relay knows about one live socket: its
//! identity, its outbound queue, its liveness state and its close signal.

use crate::liveness::Liveness;
use crate::protocol::{CloseCode, Frame};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Unique, monotonically assigned connection identity
///
/// Ordering follows registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a frame could not be queued for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbound queue full")]
    Full,

    #[error("connection closed")]
    Closed,
}

/// A single registered connection
pub struct ClientRecord {
    /// Registry key
    id: ConnectionId,

    /// Best-effort client address for logs
    remote_addr: String,

    /// Registration time
    connected_at: DateTime<Utc>,

    /// Outbound queue drained by the connection's writer task
    sender: mpsc::Sender<Frame>,

    /// Ping/pong bookkeeping
    liveness: Liveness,

    /// Set once when the relay decides to close the socket
    close_tx: watch::Sender<Option<CloseCode>>,

    /// Heartbeat task, aborted on teardown
    monitor: Mutex<Option<AbortHandle>>,
}

impl ClientRecord {
    /// Create a new record
    #[must_use]
    pub fn new(id: ConnectionId, remote_addr: String, sender: mpsc::Sender<Frame>) -> Self {
        let (close_tx, _) = watch::channel(None);

        Self {
            id,
            remote_addr,
            connected_at: Utc::now(),
            sender,
            liveness: Liveness::new(),
            close_tx,
            monitor: Mutex::new(None),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Queue a frame without waiting
    ///
    /// Fails with `Closed` once a close has been requested, even if the
    /// writer has not drained the queue yet.
    pub fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        if self.close_code().is_some() {
            return Err(DeliveryError::Closed);
        }

        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Ask the writer task to close the socket with `code`
    ///
    /// Returns false if a close was already requested; the first code wins.
    pub fn close(&self, code: CloseCode) -> bool {
        self.close_tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(code);
                true
            } else {
                false
            }
        })
    }

    /// The requested close code, if any
    pub fn close_code(&self) -> Option<CloseCode> {
        *self.close_tx.borrow()
    }

    /// Resolves once a close has been requested
    pub async fn closed(&self) -> CloseCode {
        let mut rx = self.close_tx.subscribe();
        loop {
            if let Some(code) = *rx.borrow_and_update() {
                return code;
            }
            // The sender lives in `self`, so this only fails if the record is gone
            if rx.changed().await.is_err() {
                return CloseCode::GoingAway;
            }
        }
    }

    /// Remember the heartbeat task so teardown can stop it
    pub fn attach_monitor(&self, handle: AbortHandle) {
        if let Some(previous) = self.monitor.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop the heartbeat task
    ///
    /// Safe to call repeatedly and after the task already ended on its own.
    pub fn stop_monitor(&self) {
        self.liveness.stop();
        if let Some(handle) = self.monitor.lock().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ClientRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRecord")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .field("connected_at", &self.connected_at)
            .field("liveness", &self.liveness.state())
            .field("close_code", &self.close_code())
            .finish()
    }
}
