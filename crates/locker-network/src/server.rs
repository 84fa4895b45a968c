//! TCP server exposing the locker operations.
//!
//! Clients connect, write one JSON request per line, and read one JSON
//! response per line. Every connection runs on its own task; the board itself
//! is shared through the controller, which serializes access to the line.
//!
//! # Architecture
//!
//! ```text
//! Kiosk UI ──┐
//!            ├──> LockerServer ──> LockerService ──> StatusReporter ──> LockController ──> board
//! lockerd  ──┘        │
//!                     └──> LinesCodec (newline framing)
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use locker_controller::{LockController, StatusReporter};
//! use locker_core::ServerConfig;
//! use locker_hardware::{AnyTransport, BoardOptions, SimulatedBoard};
//! use locker_network::{LockerServer, LockerService};
//! use locker_protocol::AnyCodec;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = AnyCodec::default();
//! let (board, _handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());
//! let controller = Arc::new(LockController::new(AnyTransport::from(board), codec));
//! let service = LockerService::new(StatusReporter::new(controller));
//!
//! let server = LockerServer::bind(ServerConfig::default(), service).await?;
//! server.serve_with_shutdown(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use locker_controller::StatusReporter;
use locker_core::ServerConfig;
use locker_hardware::{AnyTransport, Transport};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, trace, warn};

use crate::request::{LogLevel, Request, Response};

/// Longest request line accepted, in bytes.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Errors that can occur during server operations
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address
    #[error("Failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Response could not be encoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Line framing failed
    #[error("Codec error: {0}")]
    Codec(#[from] LinesCodecError),
}

/// Executes requests against the board.
///
/// Transport-independent so it can be driven without sockets.
#[derive(Debug)]
pub struct LockerService<T> {
    reporter: StatusReporter<T>,
}

impl<T: Transport> LockerService<T> {
    pub fn new(reporter: StatusReporter<T>) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &StatusReporter<T> {
        &self.reporter
    }

    /// Parse one request line and execute it.
    pub async fn handle_line(&self, line: &str) -> Response {
        match Request::parse(line) {
            Ok(request) => self.handle(request).await,
            Err(response) => {
                debug!(error = ?response.error, "Rejected request");
                response
            }
        }
    }

    /// Execute a validated request.
    pub async fn handle(&self, request: Request) -> Response {
        trace!(op = request.op(), "Handling request");

        match request {
            Request::OpenLocker { bay } => match self.reporter.controller().open(bay).await {
                Ok(_) => {
                    info!(bay = %bay, "Open command sent");
                    Response::message(format!("Locker {bay} command sent."))
                }
                Err(e) => {
                    error!(bay = %bay, error = %e, "Open failed");
                    Response::internal_error("Failed to communicate with controller.")
                }
            },
            Request::CheckStatus { bay } => {
                let state = self.reporter.check(bay).await;
                Response::status(bay, state)
            }
            Request::CheckAllStatuses => Response::bays(self.reporter.check_all().await),
            Request::Log { message, level } => {
                forward_log(level, &message);
                Response::ok()
            }
        }
    }
}

fn forward_log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Error => error!(target: "locker::client", "{message}"),
        LogLevel::Warn => warn!(target: "locker::client", "{message}"),
        LogLevel::Info => info!(target: "locker::client", "{message}"),
        LogLevel::Debug => debug!(target: "locker::client", "{message}"),
        LogLevel::Trace => trace!(target: "locker::client", "{message}"),
    }
}

/// TCP front end for a [`LockerService`].
///
/// Connections beyond `max_connections` are closed as soon as they are
/// accepted.
#[derive(Debug)]
pub struct LockerServer {
    listener: TcpListener,
    service: Arc<LockerService<AnyTransport>>,
    limit: Arc<Semaphore>,
    config: ServerConfig,
}

impl LockerServer {
    /// Bind the listener. Requests are not served until
    /// [`serve_with_shutdown`](Self::serve_with_shutdown) runs.
    ///
    /// # Errors
    ///
    /// Returns `BindFailed` if the address is in use or not permitted.
    pub async fn bind(
        config: ServerConfig,
        service: LockerService<AnyTransport>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::BindFailed {
                addr: config.bind_addr,
                source,
            })?;

        info!(
            addr = %listener.local_addr()?,
            max_connections = config.max_connections,
            "Locker server listening"
        );

        Ok(Self {
            listener,
            service: Arc::new(service),
            limit: Arc::new(Semaphore::new(config.max_connections)),
            config,
        })
    }

    /// Address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections until `shutdown` completes.
    ///
    /// Connections already being served finish their current request
    /// independently.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Locker server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "Accept failed");
                            continue;
                        }
                    };
                    self.spawn_connection(stream, addr);
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let Ok(permit) = Arc::clone(&self.limit).try_acquire_owned() else {
            warn!(
                addr = %addr,
                max_connections = self.config.max_connections,
                "Connection rejected: maximum connections reached"
            );
            return;
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        let connected_at = Utc::now();
        debug!(addr = %addr, "Client connected");

        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, &service).await {
                warn!(addr = %addr, error = %e, "Connection ended with error");
            }
            debug!(
                addr = %addr,
                uptime_ms = (Utc::now() - connected_at).num_milliseconds(),
                "Client disconnected"
            );
            drop(permit);
        });
    }
}

async fn serve_connection(
    stream: TcpStream,
    service: &LockerService<AnyTransport>,
) -> Result<(), ServerError> {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

    while let Some(line) = framed.next().await {
        let response = match line {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => service.handle_line(&line).await,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                Response::bad_request(format!("Request exceeds {MAX_LINE_LENGTH} bytes"))
            }
            Err(e) => return Err(e.into()),
        };

        framed.send(serde_json::to_string(&response)?).await?;
    }

    Ok(())
}
