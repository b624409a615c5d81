//! Test fixtures and frame builders
//!
//! Provides reusable configuration and protocol frames for integration tests.

use relay_common::{AppConfig, AppSettings, AuthConfig, Environment, HeartbeatConfig, ServerConfig};
use relay_gateway::protocol::MessageType;

/// Username accepted by test servers
pub const TEST_USERNAME: &str = "admin";

/// Password accepted by test servers
pub const TEST_PASSWORD: &str = "secret";

/// Keepalive long enough that no test sees a heartbeat by accident
pub const QUIET_KEEPALIVE_MS: u64 = 60_000;

/// Create a test configuration
pub fn test_config(keepalive_ms: u64) -> AppConfig {
    AppConfig {
        app: AppSettings {
            name: "msg-relay-test".to_string(),
            env: Environment::Development,
        },
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(),
        },
        auth: AuthConfig {
            username: TEST_USERNAME.to_string(),
            password: TEST_PASSWORD.to_string(),
        },
        heartbeat: HeartbeatConfig { keepalive_ms },
    }
}

/// Build a frame with a tag and payload
pub fn frame(kind: MessageType, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![kind.as_u8()];
    bytes.extend_from_slice(payload);
    bytes
}

/// Build a one-byte control frame
pub fn signal(kind: MessageType) -> Vec<u8> {
    vec![kind.as_u8()]
}
