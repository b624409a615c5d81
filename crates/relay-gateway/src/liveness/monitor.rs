//! Heartbeat task
//!
//! One task per connection. Every keepalive interval it either sends a PING
//! frame or, if the previous PING went unanswered, closes the connection
//! with 1000 and removes it from the registry.

use super::TickOutcome;
use crate::connection::{ClientRecord, ConnectionRegistry, DeliveryError};
use crate::protocol::{CloseCode, Frame, MessageType};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Why a heartbeat task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// Peer missed a pong; connection was closed and deregistered
    TimedOut,
    /// Connection closed for another reason
    Closed,
}

/// Start the heartbeat task for a connection and attach it to the record
pub fn spawn_monitor(
    record: Arc<ClientRecord>,
    registry: Arc<ConnectionRegistry>,
    keepalive: Duration,
) -> JoinHandle<MonitorExit> {
    let handle = tokio::spawn(run_monitor(record.clone(), registry, keepalive));
    record.attach_monitor(handle.abort_handle());
    handle
}

/// Heartbeat loop
pub async fn run_monitor(
    record: Arc<ClientRecord>,
    registry: Arc<ConnectionRegistry>,
    keepalive: Duration,
) -> MonitorExit {
    let mut ticker = interval_at(Instant::now() + keepalive, keepalive);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = record.closed() => return MonitorExit::Closed,
            _ = ticker.tick() => {}
        }

        match record.liveness().on_tick() {
            TickOutcome::SendPing => {
                match record.deliver(Frame::signal(MessageType::Ping)) {
                    Ok(()) => {
                        tracing::trace!(connection_id = %record.id(), "Ping sent");
                    }
                    // Unanswered pings time out on the next tick
                    Err(DeliveryError::Full) => {
                        tracing::debug!(connection_id = %record.id(), "Ping dropped, queue full");
                    }
                    Err(DeliveryError::Closed) => return MonitorExit::Closed,
                }
            }
            TickOutcome::Dead => {
                tracing::warn!(
                    connection_id = %record.id(),
                    remote_addr = %record.remote_addr(),
                    "Client did not respond to ping in time"
                );
                record.close(CloseCode::Normal);
                registry.remove(record.id());
                return MonitorExit::TimedOut;
            }
            TickOutcome::Stopped => return MonitorExit::Closed,
        }
    }
}
