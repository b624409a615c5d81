//! Relay frames
//!
//! A frame is an immutable byte buffer shared by every connection it is
//! fanned out to. Cloning a frame only bumps a reference count.

use super::MessageType;
use std::sync::Arc;

/// A binary relay frame: one tag byte followed by an opaque payload
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(Arc<[u8]>);

impl Frame {
    /// Create a frame from raw bytes as received from a peer
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Create a one-byte control frame (PING, NO_SYNC_ANSWER, ...)
    #[must_use]
    pub fn signal(kind: MessageType) -> Self {
        Self(Arc::from([kind.as_u8()].as_slice()))
    }

    /// Create a frame from a tag and payload
    #[must_use]
    pub fn with_payload(kind: MessageType, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.push(kind.as_u8());
        bytes.extend_from_slice(payload);
        Self::new(bytes)
    }

    /// Raw tag byte, `None` for an empty frame
    #[must_use]
    pub fn tag(&self) -> Option<u8> {
        self.0.first().copied()
    }

    /// Decoded message type, `None` for empty frames and unknown tags
    #[must_use]
    pub fn message_type(&self) -> Option<MessageType> {
        self.tag().and_then(MessageType::from_u8)
    }

    /// Bytes after the tag
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.0.get(1..).unwrap_or_default()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of live handles to the underlying buffer
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for Frame {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("type", &self.message_type())
            .field("len", &self.len())
            .finish()
    }
}
