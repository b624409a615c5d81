//! Frame fan-out
//!
//! Routes inbound frames to the connections that should receive them.

mod router;

pub use router::{DispatchReport, MessageRouter, SYNC_FANOUT};
