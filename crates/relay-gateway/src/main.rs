//! Relay server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p relay-gateway
//! ```
//!
//! Configuration is read from `config.json` (or `RELAY_CONFIG_FILE`) and
//! environment variables. Set `RELAY_LOG_FILE=logs/forward.log` to log to a
//! file instead of stdout.

use relay_common::{try_init_tracing_with_config, AppConfig, Environment, TracingConfig};
use std::env;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(tracing_config()) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    // Run the server
    if let Err(e) = run().await {
        error!(error = %e, "Relay failed to start");
        std::process::exit(1);
    }
}

fn tracing_config() -> TracingConfig {
    let app_env = env::var("APP_ENV").ok().and_then(|v| Environment::parse(&v));
    let config = match app_env {
        Some(app_env) if app_env.is_production() => TracingConfig::production(),
        Some(_) => TracingConfig::development(),
        None => TracingConfig::default(),
    };

    match env::var("RELAY_LOG_FILE") {
        Ok(path) if !path.is_empty() => config.with_log_file(path),
        _ => config,
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting relay server...");

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        env = ?config.app.env,
        addr = %config.server.addr,
        keepalive_ms = config.heartbeat.keepalive_ms,
        "Configuration loaded"
    );

    relay_gateway::run(config).await?;

    info!("Relay stopped");

    Ok(())
}
