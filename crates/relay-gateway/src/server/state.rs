//! Gateway state
//!
//! Application state for the relay server.

use crate::auth::TokenGate;
use crate::broadcast::MessageRouter;
use crate::connection::ConnectionRegistry;
use relay_common::AppConfig;
use std::sync::Arc;
use std::time::Duration;

/// Relay application state
///
/// Holds the shared components every handler needs. Cloning is cheap.
#[derive(Clone)]
pub struct GatewayState {
    /// Live connections
    registry: Arc<ConnectionRegistry>,
    /// Frame fan-out over the registry
    router: MessageRouter,
    /// Login and capability URL check
    token_gate: Arc<TokenGate>,
    /// Heartbeat interval for new connections
    keepalive: Duration,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(config: AppConfig) -> Self {
        let registry = ConnectionRegistry::new_shared();
        let token_gate = TokenGate::new_shared(&config.auth);

        Self {
            router: MessageRouter::new(registry.clone()),
            registry,
            token_gate,
            keepalive: config.heartbeat.keepalive(),
        }
    }

    /// Get the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the message router
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Get the token gate
    pub fn token_gate(&self) -> &TokenGate {
        &self.token_gate
    }

    /// Heartbeat interval for new connections
    pub fn keepalive(&self) -> Duration {
        self.keepalive
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("registry", &self.registry)
            .field("token_gate", &self.token_gate)
            .field("keepalive", &self.keepalive)
            .finish()
    }
}
