//! TCP client for the locker server.
//!
//! Sends one request line and waits for the matching response line. Used by
//! integration tests and by anything that drives `lockerd serve` remotely.
//!
//! # Example
//!
//! ```no_run
//! use locker_network::{ClientConfig, LockerClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = LockerClient::new(ClientConfig::default());
//! client.connect().await?;
//!
//! let response = client.open_locker(5).await?;
//! assert!(response.success);
//!
//! let status = client.check_status(5).await?;
//! println!("bay 5 is {:?}", status.status);
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, trace, warn};

use crate::request::Response;
use crate::server::MAX_LINE_LENGTH;

/// Configuration for [`LockerClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to connect to
    pub server_addr: SocketAddr,

    /// Timeout for connecting and for each request
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Errors that can occur during client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client is not connected
    #[error("Not connected to server")]
    NotConnected,

    /// Connection attempt timed out
    #[error("Connection timeout after {0}ms")]
    ConnectionTimeout(u64),

    /// No response within the timeout
    #[error("Read timeout after {0}ms")]
    ReadTimeout(u64),

    /// Request could not be written within the timeout
    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    /// Connection closed by server
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Response was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing failed
    #[error("Codec error: {0}")]
    Codec(String),
}

/// Client for the newline-delimited JSON locker protocol.
#[derive(Debug)]
pub struct LockerClient {
    server_addr: SocketAddr,
    framed: Option<Framed<TcpStream, LinesCodec>>,
    timeout: Duration,
}

impl LockerClient {
    /// Create a client. Call [`connect`](Self::connect) before sending.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            server_addr: config.server_addr,
            framed: None,
            timeout: config.timeout,
        }
    }

    /// Connect to the server.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionTimeout` or the underlying I/O error.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        debug!("Connecting to locker server at {}", self.server_addr);

        let stream =
            match tokio::time::timeout(self.timeout, TcpStream::connect(self.server_addr)).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(ClientError::ConnectionTimeout(self.timeout_ms()));
                }
            };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        self.framed = Some(Framed::new(
            stream,
            LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        ));
        info!("Connected to locker server at {}", self.server_addr);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// Drop the connection.
    pub fn close(&mut self) {
        if self.framed.take().is_some() {
            debug!("Closed connection to {}", self.server_addr);
        }
    }

    /// Open bay `locker_id`. Accepts anything JSON-serializable so that
    /// invalid ids can be sent too.
    pub async fn open_locker(&mut self, locker_id: impl Into<Value>) -> Result<Response, ClientError> {
        let locker_id: Value = locker_id.into();
        self.request(&json!({ "op": "open-locker", "lockerId": locker_id }))
            .await
    }

    /// Query bay `locker_id`.
    pub async fn check_status(&mut self, locker_id: impl Into<Value>) -> Result<Response, ClientError> {
        let locker_id: Value = locker_id.into();
        self.request(&json!({ "op": "check-status", "lockerId": locker_id }))
            .await
    }

    /// Query all bays.
    pub async fn check_all_statuses(&mut self) -> Result<Response, ClientError> {
        self.request(&json!({ "op": "check-all-statuses" })).await
    }

    /// Forward a log line to the server's log.
    pub async fn log(&mut self, message: &str, level: &str) -> Result<Response, ClientError> {
        self.request(&json!({ "op": "log", "message": message, "level": level }))
            .await
    }

    /// Send a JSON request and wait for its response.
    pub async fn request(&mut self, request: &Value) -> Result<Response, ClientError> {
        let line = serde_json::to_string(request)?;
        self.send_line(&line).await
    }

    /// Send a raw line and wait for the response line.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected`, `ReadTimeout`, `ConnectionLost` or a decoding
    /// error.
    pub async fn send_line(&mut self, line: &str) -> Result<Response, ClientError> {
        let timeout = self.timeout;
        let timeout_ms = self.timeout_ms();
        let framed = self.framed.as_mut().ok_or(ClientError::NotConnected)?;

        trace!(request = line, "Sending request");
        match tokio::time::timeout(timeout, framed.send(line)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ClientError::Codec(e.to_string())),
            Err(_) => return Err(ClientError::WriteTimeout(timeout_ms)),
        }

        let received = tokio::time::timeout(timeout, framed.next()).await;
        match received {
            Ok(Some(Ok(reply))) => {
                trace!(response = %reply, "Received response");
                Ok(serde_json::from_str(&reply)?)
            }
            Ok(Some(Err(e))) => Err(ClientError::Codec(e.to_string())),
            Ok(None) => {
                self.framed = None;
                Err(ClientError::ConnectionLost(
                    "Server closed connection".to_string(),
                ))
            }
            Err(_) => Err(ClientError::ReadTimeout(timeout_ms)),
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
