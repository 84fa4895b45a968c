//! Transport layer for the locker control board.
//!
//! This crate moves encoded frames between the host and the board. It does not
//! interpret frames; see `locker-protocol` for that.
//!
//! # Transports
//!
//! - [`SerialTransport`]: a physical board on a serial port. The port is opened
//!   per exchange, stale input is discarded, the frame is written, and the reply
//!   is read within a bounded window.
//! - [`MockTransport`]: scripted replies and failures for tests.
//! - [`SimulatedBoard`]: an in-process board with per-bay latches and
//!   unsolicited status pushes.
//!
//! [`AnyTransport`] selects among them at runtime.
//!
//! # Error Handling
//!
//! Silence from the board is not an error: the exchange succeeds with whatever
//! bytes arrived, possibly none. [`HardwareError`] is reserved for faults of
//! the port itself and converts into `locker_core::Error` at the controller
//! boundary.

pub mod devices;
pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;
pub mod types;

pub use devices::AnyTransport;
pub use error::{HardwareError, Result};
pub use mock::{
    BoardOptions, MockTransport, MockTransportHandle, ScriptedResponse, SimulatedBoard,
    SimulatedBoardHandle,
};
pub use serial::{SerialTransport, list_ports};
pub use traits::Transport;
pub use types::PortInfo;
