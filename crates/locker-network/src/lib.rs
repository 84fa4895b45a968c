//! Network interface for the locker service.
//!
//! This crate exposes the lock controller to other processes over TCP using
//! newline-delimited JSON. The kiosk UI opens bays and polls their state
//! through it.
//!
//! # Components
//!
//! - **LockerServer**: accepts connections and executes requests
//! - **LockerService**: request execution, independent of sockets
//! - **LockerClient**: client for the same protocol
//!
//! # Operations
//!
//! | `op`                 | fields                | response                         |
//! |----------------------|-----------------------|----------------------------------|
//! | `open-locker`        | `lockerId`            | `message`                        |
//! | `check-status`       | `lockerId`            | `status`, `channel`              |
//! | `check-all-statuses` |                       | `bays`                           |
//! | `log`                | `message`, `level`    |                                  |
//!
//! Every response carries `code` (200, 400 or 500) and `success`; failures
//! carry `error`.

mod client;
mod request;
mod server;

pub use client::{ClientConfig, ClientError, LockerClient};
pub use request::{CODE_BAD_REQUEST, CODE_INTERNAL_ERROR, CODE_OK, LogLevel, Request, Response};
pub use server::{LockerServer, LockerService, MAX_LINE_LENGTH, ServerError};
