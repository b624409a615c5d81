//! Connection management
//!
//! Tracks live WebSocket connections and their per-connection state.

mod client;
mod registry;

pub use client::{ClientRecord, ConnectionId, DeliveryError};
pub use registry::ConnectionRegistry;
