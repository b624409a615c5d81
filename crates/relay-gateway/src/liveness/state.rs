//! Per-connection ping/pong state
//!
//! `Armed -(tick)-> AwaitingPong -(pong)-> Armed`, with `Stopped` terminal.
//! The pong counter is the source of truth; the state is kept alongside it
//! for logs and tests.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Liveness state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LivenessState {
    /// A pong arrived since the last ping (or no ping sent yet)
    Armed = 0,
    /// Ping sent, no pong yet
    AwaitingPong = 1,
    /// Monitor finished, either timed out or torn down
    Stopped = 2,
}

impl LivenessState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Armed,
            1 => Self::AwaitingPong,
            _ => Self::Stopped,
        }
    }
}

/// What the monitor should do on a timer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Peer answered; send the next ping
    SendPing,
    /// No pong since the last ping; close and deregister
    Dead,
    /// Monitor was already stopped
    Stopped,
}

/// Pong counter plus explicit state
#[derive(Debug)]
pub struct Liveness {
    pongs: AtomicU64,
    state: AtomicU8,
}

impl Liveness {
    /// Counter starts at 1 so the first tick always pings
    #[must_use]
    pub fn new() -> Self {
        Self {
            pongs: AtomicU64::new(1),
            state: AtomicU8::new(LivenessState::Armed as u8),
        }
    }

    /// Advance on a timer tick
    pub fn on_tick(&self) -> TickOutcome {
        if self.state() == LivenessState::Stopped {
            return TickOutcome::Stopped;
        }

        if self.pongs.swap(0, Ordering::AcqRel) == 0 {
            self.state
                .store(LivenessState::Stopped as u8, Ordering::Release);
            return TickOutcome::Dead;
        }

        // A pong racing this tick may already have re-armed; leave that alone
        let _ = self.state.compare_exchange(
            LivenessState::Armed as u8,
            LivenessState::AwaitingPong as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        TickOutcome::SendPing
    }

    /// Record a pong from the peer
    pub fn on_pong(&self) {
        self.pongs.fetch_add(1, Ordering::AcqRel);
        let _ = self.state.compare_exchange(
            LivenessState::AwaitingPong as u8,
            LivenessState::Armed as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Move to the terminal state
    pub fn stop(&self) {
        self.state
            .store(LivenessState::Stopped as u8, Ordering::Release);
    }

    pub fn state(&self) -> LivenessState {
        LivenessState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Pongs received since the last ping
    pub fn pong_count(&self) -> u64 {
        self.pongs.load(Ordering::Acquire)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
