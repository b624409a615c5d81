//! Client address resolution
//!
//! Reverse proxies report the real client in `X-Real-IP` or
//! `X-Forwarded-For`; the socket peer is the fallback.

use axum::http::HeaderMap;
use std::net::SocketAddr;

const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Best-effort client address for logging
pub fn resolve_remote_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    header_value(headers, X_REAL_IP)
        .or_else(|| header_value(headers, X_FORWARDED_FOR))
        .or_else(|| peer.map(|addr| addr.to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
