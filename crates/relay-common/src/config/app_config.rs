//! Application configuration structs
//!
//! Loads configuration from environment variables and from the JSON config
//! file the relay has always accepted (`{"Addr", "Username", "Password"}`).

use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when `RELAY_CONFIG_FILE` is unset
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub heartbeat: HeartbeatConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Parse an `APP_ENV` value, ignoring case
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address, either `host:port` or the short `:port` form
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl ServerConfig {
    /// Resolve the configured address into a socket address
    ///
    /// A bare `:port` binds on every interface.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = self.addr.trim();
        let full = if addr.starts_with(':') {
            format!("0.0.0.0{addr}")
        } else {
            addr.to_string()
        };

        full.parse()
            .map_err(|_| ConfigError::InvalidValue("RELAY_ADDR", self.addr.clone()))
    }
}

/// The single credential pair accepted by `/login`
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Liveness heartbeat configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatConfig {
    /// Interval between pings, also the pong deadline
    #[serde(default = "default_keepalive_ms")]
    pub keepalive_ms: u64,
}

impl HeartbeatConfig {
    #[must_use]
    pub fn keepalive(&self) -> Duration {
        Duration::from_millis(self.keepalive_ms)
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            keepalive_ms: default_keepalive_ms(),
        }
    }
}

/// Shape of the JSON config file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FileConfig {
    addr: Option<String>,
    username: String,
    password: String,
}

// Default value functions
fn default_app_name() -> String {
    "msg-relay".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_keepalive_ms() -> u64 {
    60_000 // 60 seconds
}

impl AppConfig {
    /// Load configuration the way the binary does
    ///
    /// Uses the file named by `RELAY_CONFIG_FILE`, falling back to
    /// `./config.json` when it exists, and to plain environment variables
    /// otherwise.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let explicit = env::var("RELAY_CONFIG_FILE").ok().map(PathBuf::from);
        Self::load_with(explicit, Path::new(DEFAULT_CONFIG_FILE))
    }

    /// An explicit file wins, then `fallback` if present, then the environment
    fn load_with(explicit: Option<PathBuf>, fallback: &Path) -> Result<Self, ConfigError> {
        let path = explicit.or_else(|| fallback.exists().then(|| fallback.to_path_buf()));

        match path {
            Some(path) => Self::from_json_file(path),
            None => Self::from_env(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load the listener address and credentials from a JSON file
    ///
    /// Settings the file does not carry still come from the environment.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(display.clone(), e))?;
        let file: FileConfig =
            serde_json::from_str(&raw).map_err(|e| ConfigError::ParseFile(display, e))?;

        tracing::debug!(path = %path.display(), "Loaded config file");

        Self::from_lookup(|key| match key {
            "RELAY_ADDR" => file.addr.clone().or_else(|| env::var(key).ok()),
            "RELAY_USERNAME" => Some(file.username.clone()),
            "RELAY_PASSWORD" => Some(file.password.clone()),
            _ => env::var(key).ok(),
        })
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let keepalive_ms = match lookup("RELAY_KEEPALIVE_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidValue("RELAY_KEEPALIVE_MS", raw))?,
            None => default_keepalive_ms(),
        };

        let config = Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            server: ServerConfig {
                addr: lookup("RELAY_ADDR").unwrap_or_else(default_addr),
            },
            auth: AuthConfig {
                username: lookup("RELAY_USERNAME")
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::MissingVar("RELAY_USERNAME"))?,
                password: lookup("RELAY_PASSWORD")
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::MissingVar("RELAY_PASSWORD"))?,
            },
            heartbeat: HeartbeatConfig { keepalive_ms },
        };

        // Fail at boot rather than at bind time
        config.server.socket_addr()?;

        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Failed to read config file {0}: {1}")]
    ReadFile(String, #[source] std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    ParseFile(String, #[source] serde_json::Error),
}
