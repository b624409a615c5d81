//! Message router
//!
//! Classifies inbound frames by their tag byte and fans them out through the
//! registry. One frame buffer is shared by every target; a target that cannot
//! take the frame is logged and skipped while the rest still receive it.

use crate::connection::{ClientRecord, ConnectionRegistry};
use crate::protocol::{Frame, MessageType};
use std::sync::Arc;

/// How many other peers an ASK_SYNC is forwarded to
pub const SYNC_FANOUT: usize = 2;

/// Result of routing one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Decoded type, `None` for empty frames and unknown tags
    pub kind: Option<MessageType>,
    /// Targets the frame was queued for
    pub delivered: usize,
    /// Targets that were full or closing
    pub failed: usize,
    /// Whether the sender was told nobody can answer its sync request
    pub no_sync_answer: bool,
}

impl DispatchReport {
    fn new(kind: Option<MessageType>) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Targets the router attempted
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Routes inbound frames to their targets
#[derive(Debug, Clone)]
pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
}

impl MessageRouter {
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Route one frame received from `sender`
    pub fn dispatch(&self, sender: &ClientRecord, frame: Frame) -> DispatchReport {
        let kind = frame.message_type();
        let mut report = DispatchReport::new(kind);

        match kind {
            Some(MessageType::Pong) => {
                sender.liveness().on_pong();
                tracing::trace!(connection_id = %sender.id(), "Pong received");
            }
            Some(MessageType::Msg) => {
                self.registry
                    .for_each(|target| Self::forward(&mut report, target, &frame));
            }
            Some(MessageType::AskSync) => {
                for target in self
                    .registry
                    .snapshot()
                    .iter()
                    .filter(|target| target.id() != sender.id())
                    .take(SYNC_FANOUT)
                {
                    Self::forward(&mut report, target, &frame);
                }

                if report.attempted() == 0 {
                    report.no_sync_answer = true;
                    if let Err(e) = sender.deliver(Frame::signal(MessageType::NoSyncAnswer)) {
                        tracing::warn!(
                            connection_id = %sender.id(),
                            error = %e,
                            "Failed to send NO_SYNC_ANSWER"
                        );
                    }
                }
            }
            Some(MessageType::SyncAnswer) => {
                self.registry.for_each(|target| {
                    if target.id() != sender.id() {
                        Self::forward(&mut report, target, &frame);
                    }
                });
            }
            Some(
                MessageType::Ping
                | MessageType::Error
                | MessageType::Ok
                | MessageType::NoSyncAnswer,
            )
            | None => {
                tracing::debug!(
                    connection_id = %sender.id(),
                    tag = ?frame.tag(),
                    len = frame.len(),
                    "Dropping unroutable frame"
                );
            }
        }

        if report.attempted() > 0 {
            tracing::trace!(
                connection_id = %sender.id(),
                kind = ?kind,
                delivered = report.delivered,
                failed = report.failed,
                "Frame relayed"
            );
        }

        report
    }

    fn forward(report: &mut DispatchReport, target: &ClientRecord, frame: &Frame) {
        match target.deliver(frame.clone()) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    connection_id = %target.id(),
                    remote_addr = %target.remote_addr(),
                    error = %e,
                    "Failed to relay frame"
                );
            }
        }
    }
}
