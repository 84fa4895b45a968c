//! Transports that run without a physical board.
//!
//! [`MockTransport`] replays a script and is meant for unit tests.
//! [`SimulatedBoard`] behaves like a real board and backs `lockerd --simulate`.

pub mod board;
pub mod transport;

pub use board::{BoardOptions, SimulatedBoard, SimulatedBoardHandle};
pub use transport::{MockTransport, MockTransportHandle, ScriptedResponse};
