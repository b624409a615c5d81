//! Shared session token
//!
//! The relay has exactly one accepted credential pair and hands out exactly
//! one token. The token is generated on the first successful login and never
//! changes for the life of the process. WebSocket URLs must end with it.

use parking_lot::Mutex;
use rand::Rng;
use relay_common::AuthConfig;
use std::sync::Arc;

/// Length of the generated token
pub const TOKEN_LENGTH: usize = 32;

/// Characters allowed in a token
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Token gate errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,
}

/// Issues and validates the single shared access token
pub struct TokenGate {
    username: String,
    password: String,
    token: Mutex<Option<String>>,
}

impl TokenGate {
    /// Create a gate accepting the given credentials
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            token: Mutex::new(None),
        }
    }

    /// Create a gate wrapped in Arc
    #[must_use]
    pub fn new_shared(auth: &AuthConfig) -> Arc<Self> {
        Arc::new(Self::new(auth.username.clone(), auth.password.clone()))
    }

    /// Check credentials and return the shared token
    ///
    /// The first successful call generates the token; every later call
    /// returns the same one. A mismatch has no side effects.
    pub fn issue_or_get(&self, username: &str, password: &str) -> Result<String, AuthError> {
        if username != self.username || password != self.password {
            tracing::debug!(username = %username, "Login rejected");
            return Err(AuthError::Unauthorized);
        }

        let mut guard = self.token.lock();
        let token = guard.get_or_insert_with(|| {
            tracing::info!("Session token issued");
            generate_token()
        });

        Ok(token.clone())
    }

    /// Whether `path` ends with the issued token
    ///
    /// Always false before the first successful login.
    pub fn validate_path(&self, path: &str) -> bool {
        self.token
            .lock()
            .as_deref()
            .is_some_and(|token| path.ends_with(token))
    }

    /// The issued token, if any
    pub fn current(&self) -> Option<String> {
        self.token.lock().clone()
    }
}

impl std::fmt::Debug for TokenGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGate")
            .field("username", &self.username)
            .field("issued", &self.token.lock().is_some())
            .finish()
    }
}

/// Generate a random alphanumeric token
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
