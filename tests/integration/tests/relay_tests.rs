//! Relay Integration Tests
//!
//! Each test spawns its own relay on an ephemeral port; no external services
//! are required.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use std::time::Duration;

use integration_tests::{assert_status, fixtures::*, TestServer};
use relay_gateway::protocol::MessageType;
use reqwest::StatusCode;

// ============================================================================
// HTTP Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    assert_status(&response, StatusCode::OK).unwrap();
}

#[tokio::test]
async fn test_login_returns_stable_token() {
    let server = TestServer::start().await.expect("Failed to start server");

    let first = server.token().await.unwrap();
    let second = server.token().await.unwrap();

    assert_eq!(first.len(), 32);
    assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server.login(TEST_USERNAME, "wrong").await.unwrap();
    assert_status(&response, StatusCode::UNAUTHORIZED).unwrap();

    let response = server.login("someone", TEST_PASSWORD).await.unwrap();
    assert_status(&response, StatusCode::UNAUTHORIZED).unwrap();
}

#[tokio::test]
async fn test_login_accepts_query_string() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server
        .client
        .post(format!(
            "{}/login?username={TEST_USERNAME}&password={TEST_PASSWORD}",
            server.base_url()
        ))
        .send()
        .await
        .unwrap();
    assert_status(&response, StatusCode::OK).unwrap();

    let token = response.text().await.unwrap();
    assert_eq!(token, server.token().await.unwrap());
}

#[tokio::test]
async fn test_login_rejects_get() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/login").await.unwrap();
    assert_status(&response, StatusCode::METHOD_NOT_ALLOWED).unwrap();
}

#[tokio::test]
async fn test_login_allows_any_origin() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server
        .client
        .post(format!("{}/login", server.base_url()))
        .header("Origin", "http://elsewhere.example")
        .form(&[("username", TEST_USERNAME), ("password", TEST_PASSWORD)])
        .send()
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

// ============================================================================
// Token Gate Tests
// ============================================================================

#[tokio::test]
async fn test_ws_rejected_before_login() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server.get("/ws/anything").await.unwrap();
    assert_status(&response, StatusCode::UNAUTHORIZED).unwrap();

    assert!(server.connect("anything").await.is_err());
    assert_eq!(server.connection_count(), 0);
}

#[tokio::test]
async fn test_ws_rejected_with_wrong_token() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token().await.unwrap();

    assert!(server.connect(&token[..31]).await.is_err());
    assert!(server.connect(&format!("{token}x")).await.is_err());
    assert_eq!(server.connection_count(), 0);
}

#[tokio::test]
async fn test_ws_accepts_token_suffix() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token().await.unwrap();

    let _a = server.connect(&token).await.unwrap();
    let _b = server.connect(&format!("room/{token}")).await.unwrap();
    assert_eq!(server.connection_count(), 2);
}

// ============================================================================
// Routing Tests
// ============================================================================

#[tokio::test]
async fn test_msg_reaches_all_including_sender() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token().await.unwrap();

    let mut a = server.connect(&token).await.unwrap();
    let mut b = server.connect(&token).await.unwrap();
    let mut c = server.connect(&token).await.unwrap();

    let msg = frame(MessageType::Msg, b"hello everyone");
    a.send(msg.clone()).await.unwrap();

    assert_eq!(a.recv().await.unwrap(), msg);
    assert_eq!(b.recv().await.unwrap(), msg);
    assert_eq!(c.recv().await.unwrap(), msg);
}

#[tokio::test]
async fn test_text_frames_are_relayed_as_binary() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token().await.unwrap();

    let mut a = server.connect(&token).await.unwrap();
    let mut b = server.connect(&token).await.unwrap();

    // "\u{4}" is the MSG tag
    a.send_text("\u{4}hi").await.unwrap();

    assert_eq!(b.recv().await.unwrap(), frame(MessageType::Msg, b"hi"));
    assert_eq!(a.recv().await.unwrap(), frame(MessageType::Msg, b"hi"));
}

#[tokio::test]
async fn test_ask_sync_reaches_two_earliest_peers() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token().await.unwrap();

    let mut a = server.connect(&token).await.unwrap();
    let mut b = server.connect(&token).await.unwrap();
    let mut c = server.connect(&token).await.unwrap();
    let mut d = server.connect(&token).await.unwrap();

    let ask = frame(MessageType::AskSync, b"who has state?");
    d.send(ask.clone()).await.unwrap();

    assert_eq!(a.recv().await.unwrap(), ask);
    assert_eq!(b.recv().await.unwrap(), ask);
    c.expect_silence().await.unwrap();
    d.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_ask_sync_alone_gets_no_sync_answer() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token().await.unwrap();

    let mut a = server.connect(&token).await.unwrap();
    a.send(frame(MessageType::AskSync, b"anyone?")).await.unwrap();

    assert_eq!(a.recv().await.unwrap(), signal(MessageType::NoSyncAnswer));
    a.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_sync_answer_skips_sender() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token().await.unwrap();

    let mut a = server.connect(&token).await.unwrap();
    let mut b = server.connect(&token).await.unwrap();
    let mut c = server.connect(&token).await.unwrap();

    let answer = frame(MessageType::SyncAnswer, b"state blob");
    a.send(answer.clone()).await.unwrap();

    assert_eq!(b.recv().await.unwrap(), answer);
    assert_eq!(c.recv().await.unwrap(), answer);
    a.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_unknown_and_empty_frames_are_dropped() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token().await.unwrap();

    let mut a = server.connect(&token).await.unwrap();
    let mut b = server.connect(&token).await.unwrap();

    a.send(Vec::new()).await.unwrap();
    a.send(vec![200, 1, 2, 3]).await.unwrap();
    a.send(signal(MessageType::Ping)).await.unwrap();

    b.expect_silence().await.unwrap();
    a.expect_silence().await.unwrap();
    assert_eq!(server.connection_count(), 2);
}

#[tokio::test]
async fn test_disconnect_deregisters() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token().await.unwrap();

    let a = server.connect(&token).await.unwrap();
    let mut b = server.connect(&token).await.unwrap();

    a.close().await.unwrap();
    server.wait_for_connections(1).await.unwrap();

    // The departed peer no longer counts toward sync fan-out
    b.send(frame(MessageType::AskSync, b"x")).await.unwrap();
    assert_eq!(b.recv().await.unwrap(), signal(MessageType::NoSyncAnswer));
}

// ============================================================================
// Liveness Tests
// ============================================================================

#[tokio::test]
async fn test_silent_client_is_closed_with_1000() {
    let server = TestServer::start_with_keepalive(150)
        .await
        .expect("Failed to start server");
    let token = server.token().await.unwrap();

    let mut a = server.connect(&token).await.unwrap();

    let (code, frames) = a.recv_close(Duration::from_secs(3)).await.unwrap();
    assert_eq!(code, Some(1000));
    assert_eq!(frames.first(), Some(&signal(MessageType::Ping)));

    server.wait_for_connections(0).await.unwrap();
}

#[tokio::test]
async fn test_ponging_client_stays_connected() {
    let server = TestServer::start_with_keepalive(150)
        .await
        .expect("Failed to start server");
    let token = server.token().await.unwrap();

    let mut a = server.connect(&token).await.unwrap();

    for _ in 0..4 {
        assert_eq!(a.recv().await.unwrap(), signal(MessageType::Ping));
        a.send(signal(MessageType::Pong)).await.unwrap();
    }

    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn test_timed_out_peer_stops_receiving_broadcasts() {
    let server = TestServer::start_with_keepalive(150)
        .await
        .expect("Failed to start server");
    let token = server.token().await.unwrap();

    let mut silent = server.connect(&token).await.unwrap();
    let mut alive = server.connect(&token).await.unwrap();

    // Keep one peer answering while the other times out
    let (code, _) = tokio::join!(silent.recv_close(Duration::from_secs(3)), async {
        for _ in 0..3 {
            if let Ok(bytes) = alive.recv().await {
                if bytes == signal(MessageType::Ping) {
                    alive.send(signal(MessageType::Pong)).await.ok();
                }
            }
        }
    });
    assert_eq!(code.unwrap().0, Some(1000));

    server.wait_for_connections(1).await.unwrap();

    alive.send(frame(MessageType::AskSync, b"x")).await.unwrap();
    loop {
        let bytes = alive.recv().await.unwrap();
        if bytes == signal(MessageType::Ping) {
            alive.send(signal(MessageType::Pong)).await.unwrap();
            continue;
        }
        assert_eq!(bytes, signal(MessageType::NoSyncAnswer));
        break;
    }
}
