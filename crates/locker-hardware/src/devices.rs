//! Enum wrapper for transport dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn Transport>` is
//! not available. [`AnyTransport`] gives the controller one concrete type
//! while the backing link is chosen at runtime from configuration.

use bytes::Bytes;
use locker_protocol::Frame;

use crate::Result;
use crate::mock::{MockTransport, SimulatedBoard};
use crate::serial::SerialTransport;
use crate::traits::Transport;

/// Any supported transport.
///
/// # Examples
///
/// ```
/// use locker_hardware::{AnyTransport, MockTransport, Transport};
///
/// let (mock, _handle) = MockTransport::new();
/// let transport = AnyTransport::from(mock);
/// assert_eq!(transport.describe(), "mock mock");
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTransport {
    /// Physical board on a serial port.
    Serial(SerialTransport),
    /// Scripted transport for tests.
    Mock(MockTransport),
    /// In-process board emulation.
    Simulated(SimulatedBoard),
}

impl Transport for AnyTransport {
    async fn exchange(&mut self, frame: &Frame, read_window: usize) -> Result<Bytes> {
        match self {
            Self::Serial(transport) => transport.exchange(frame, read_window).await,
            Self::Mock(transport) => transport.exchange(frame, read_window).await,
            Self::Simulated(transport) => transport.exchange(frame, read_window).await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Serial(transport) => transport.describe(),
            Self::Mock(transport) => transport.describe(),
            Self::Simulated(transport) => transport.describe(),
        }
    }
}

impl From<SerialTransport> for AnyTransport {
    fn from(transport: SerialTransport) -> Self {
        Self::Serial(transport)
    }
}

impl From<MockTransport> for AnyTransport {
    fn from(transport: MockTransport) -> Self {
        Self::Mock(transport)
    }
}

impl From<SimulatedBoard> for AnyTransport {
    fn from(transport: SimulatedBoard) -> Self {
        Self::Simulated(transport)
    }
}
