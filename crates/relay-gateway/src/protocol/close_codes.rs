//! WebSocket close codes
//!
//! The relay only ever closes with standard RFC 6455 codes.

/// Close codes sent by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Liveness timeout, the peer did not answer a ping in time
    Normal = 1000,
    /// Server shutting down
    GoingAway = 1001,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1000 => Some(Self::Normal),
            1001 => Some(Self::GoingAway),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Get the reason text sent in the close frame
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::Normal => "ping timeout",
            Self::GoingAway => "server shutting down",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.reason(), self.as_u16())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
