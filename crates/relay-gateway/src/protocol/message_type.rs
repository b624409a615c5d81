//! Relay message types
//!
//! The first byte of every binary frame is one of these tags.

/// Relay message type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Error report (never routed)
    Error = 0,
    /// Acknowledgement (never routed)
    Ok = 1,
    /// Liveness probe (server only)
    Ping = 2,
    /// Liveness reply (client only)
    Pong = 3,
    /// Application message, relayed to every peer including the sender
    Msg = 4,
    /// Sync request, relayed to up to two other peers
    AskSync = 5,
    /// Sync reply, relayed to every peer except the sender
    SyncAnswer = 6,
    /// Sent back to a sync requester that has no peers (server only)
    NoSyncAnswer = 7,
}

impl MessageType {
    /// Create a `MessageType` from a raw tag byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Error),
            1 => Some(Self::Ok),
            2 => Some(Self::Ping),
            3 => Some(Self::Pong),
            4 => Some(Self::Msg),
            5 => Some(Self::AskSync),
            6 => Some(Self::SyncAnswer),
            7 => Some(Self::NoSyncAnswer),
            _ => None,
        }
    }

    /// Get the raw tag byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the name of this message type
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Ok => "OK",
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Msg => "MSG",
            Self::AskSync => "ASK_SYNC",
            Self::SyncAnswer => "SYNC_ANSWER",
            Self::NoSyncAnswer => "NO_SYNC_ANSWER",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        kind.as_u8()
    }
}
