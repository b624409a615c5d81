//! Test helpers for integration tests
//!
//! Provides utilities for spawning test servers, making HTTP requests, and
//! driving WebSocket clients.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Result};
use futures_util::{SinkExt, StreamExt};
use relay_common::AppConfig;
use relay_gateway::{create_app, GatewayState};
use reqwest::{Client, Response, StatusCode};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::fixtures::{test_config, QUIET_KEEPALIVE_MS, TEST_PASSWORD, TEST_USERNAME};

/// Default wait for an expected frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub state: GatewayState,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config(QUIET_KEEPALIVE_MS)).await
    }

    /// Start a test server with a short heartbeat
    pub async fn start_with_keepalive(keepalive_ms: u64) -> Result<Self> {
        Self::start_with_config(test_config(keepalive_ms)).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let state = GatewayState::new(config);
        let app = create_app(state.clone());

        // Bind to an ephemeral port
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        // Spawn server task
        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            state,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// POST the login form
    pub async fn login(&self, username: &str, password: &str) -> Result<Response> {
        let url = format!("{}/login", self.base_url());
        Ok(self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?)
    }

    /// Log in with the test credentials and return the token
    pub async fn token(&self) -> Result<String> {
        let response = self.login(TEST_USERNAME, TEST_PASSWORD).await?;
        assert_status(&response, StatusCode::OK)?;
        Ok(response.text().await?)
    }

    /// Open a WebSocket on `/ws/<token>` and wait until it is registered
    pub async fn connect(&self, token: &str) -> Result<WsClient> {
        let before = self.connection_count();
        let url = format!("ws://{}/ws/{}", self.addr, token);
        let (stream, _) = connect_async(url.as_str()).await?;

        self.wait_for_connections(before + 1).await?;
        Ok(WsClient { stream })
    }

    /// Number of connections the relay currently tracks
    pub fn connection_count(&self) -> usize {
        self.state.registry().len()
    }

    /// Poll until the registry holds exactly `expected` connections
    pub async fn wait_for_connections(&self, expected: usize) -> Result<()> {
        let reached = tokio::time::timeout(RECV_TIMEOUT, async {
            while self.connection_count() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        if reached.is_err() {
            bail!(
                "Expected {} connections, server has {}",
                expected,
                self.connection_count()
            );
        }
        Ok(())
    }
}

/// WebSocket test client
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Send a binary frame
    pub async fn send(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.stream.send(Message::Binary(bytes)).await?;
        Ok(())
    }

    /// Send a text frame
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Next binary frame, or `None` if nothing arrives within `wait`
    pub async fn recv_within(&mut self, wait: Duration) -> Result<Option<Vec<u8>>> {
        let next: Result<Result<Option<Vec<u8>>>, _> = tokio::time::timeout(wait, async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Binary(bytes))) => return Ok(Some(bytes)),
                    Some(Ok(Message::Close(frame))) => {
                        bail!("Connection closed: {frame:?}")
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(None),
                }
            }
        })
        .await;

        match next {
            Ok(result) => result,
            Err(_) => Ok(None),
        }
    }

    /// Next binary frame, failing if none arrives
    pub async fn recv(&mut self) -> Result<Vec<u8>> {
        match self.recv_within(RECV_TIMEOUT).await? {
            Some(bytes) => Ok(bytes),
            None => bail!("No frame received within {RECV_TIMEOUT:?}"),
        }
    }

    /// Assert that no binary frame arrives for a short while
    pub async fn expect_silence(&mut self) -> Result<()> {
        if let Some(bytes) = self.recv_within(Duration::from_millis(200)).await? {
            bail!("Unexpected frame: {bytes:?}");
        }
        Ok(())
    }

    /// Read until the server closes, returning the close code and any
    /// binary frames seen first
    pub async fn recv_close(&mut self, wait: Duration) -> Result<(Option<u16>, Vec<Vec<u8>>)> {
        let mut frames = Vec::new();

        let closed: Result<Result<Option<u16>>, _> = tokio::time::timeout(wait, async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Binary(bytes))) => frames.push(bytes),
                    Some(Ok(Message::Close(frame))) => return Ok(frame.map(|f| u16::from(f.code))),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(anyhow::Error::from(e)),
                    None => return Ok(None),
                }
            }
        })
        .await;

        match closed {
            Ok(code) => Ok((code?, frames)),
            Err(_) => bail!("Server did not close within {wait:?}"),
        }
    }

    /// Close from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Assert response status
pub fn assert_status(response: &Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        bail!("Expected status {}, got {}", expected_status, status);
    }
    Ok(())
}
