//! # relay-gateway
//!
//! Token-gated WebSocket relay: one shared session token, a registry of live
//! connections, a ping/pong heartbeat per connection, and tag-based fan-out
//! of binary frames between peers.

pub mod auth;
pub mod broadcast;
pub mod connection;
pub mod liveness;
pub mod protocol;
pub mod server;

pub use server::{create_app, create_router, run, run_server, GatewayState};
