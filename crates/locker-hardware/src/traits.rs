//! Transport trait definition.
//!
//! A transport owns the half-duplex line to the locker board and performs
//! one write-then-read exchange per call. It knows nothing about frame
//! contents; encoding and decoding belong to the codec.
//!
//! The trait uses native `async fn` (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use bytes::Bytes;
use locker_protocol::Frame;

use crate::error::Result;

/// Half-duplex link to a locker board.
///
/// # Object Safety and Dynamic Dispatch
///
/// This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. For runtime selection use the enum wrapper
/// [`AnyTransport`](crate::devices::AnyTransport):
///
/// ```no_run
/// use locker_core::{Bay, SerialConfig};
/// use locker_hardware::{AnyTransport, SerialTransport, Transport};
/// use locker_protocol::{AnyCodec, Command, FrameCodec};
///
/// # async fn example() -> locker_hardware::Result<()> {
/// let mut transport = AnyTransport::Serial(SerialTransport::new(SerialConfig::default()));
/// let codec = AnyCodec::default();
///
/// let frame = codec.encode(Command::QueryStatus, Bay::new(1).unwrap(), &[]);
/// let reply = transport.exchange(&frame, codec.read_window()).await?;
/// println!("{} bytes back", reply.len());
/// # Ok(())
/// # }
/// ```
///
/// # Contract
///
/// - Stale input is discarded before the frame is written.
/// - At most `read_window` bytes are returned.
/// - A board that does not answer yields `Ok` with an empty buffer.
/// - `Err` is reserved for faults of the port or driver.
/// - Every call returns within the transport's configured timeouts.
pub trait Transport: Send + Sync {
    /// Write `frame`, wait for the board to settle, and read its response.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The port cannot be opened (`HardwareError::Unavailable`)
    /// - Writing or reading fails at the driver level
    async fn exchange(&mut self, frame: &Frame, read_window: usize) -> Result<Bytes>;

    /// Human-readable description of the link, used in log lines.
    fn describe(&self) -> String;
}
