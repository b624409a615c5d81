//! Connection liveness
//!
//! Ping/pong bookkeeping and the per-connection heartbeat task.

mod monitor;
mod state;

pub use monitor::{run_monitor, spawn_monitor, MonitorExit};
pub use state::{Liveness, LivenessState, TickOutcome};
