//! Scripted transport for tests.
//!
//! Each exchange consumes the next scripted response. Tests push responses
//! and inspect the frames that were written through a [`MockTransportHandle`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use locker_protocol::Frame;

use crate::error::{HardwareError, Result};
use crate::traits::Transport;

/// One scripted outcome of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedResponse {
    /// Bytes the board puts on the line. Truncated to the read window.
    Reply(Bytes),
    /// The board stays quiet.
    Silence,
    /// The driver reports a fault after opening.
    Failure(String),
    /// The port cannot be opened.
    Unavailable(String),
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<ScriptedResponse>,
    sent: Vec<Frame>,
    windows: Vec<usize>,
}

/// Mock transport driven by a script.
///
/// An exhausted script behaves like a silent board.
///
/// # Examples
///
/// ```
/// use locker_core::Bay;
/// use locker_hardware::{MockTransport, Transport};
/// use locker_protocol::{AnyCodec, Command, FrameCodec};
///
/// #[tokio::main]
/// async fn main() -> locker_hardware::Result<()> {
///     let (mut transport, handle) = MockTransport::new();
///     let codec = AnyCodec::default();
///     let bay = Bay::new(2).unwrap();
///
///     handle.push_reply(codec.encode_reply(Command::QueryStatus, bay, 0x01).as_bytes());
///
///     let frame = codec.encode(Command::QueryStatus, bay, &[]);
///     let reply = transport.exchange(&frame, codec.read_window()).await?;
///
///     assert_eq!(reply.len(), 11);
///     assert_eq!(handle.sent_frames(), vec![frame]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    name: String,
    latency: Duration,
}

impl MockTransport {
    /// Create a mock transport and the handle that scripts it.
    pub fn new() -> (Self, MockTransportHandle) {
        Self::with_name("mock")
    }

    /// Create a mock transport with a custom name for log lines.
    pub fn with_name(name: impl Into<String>) -> (Self, MockTransportHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let transport = Self {
            state: Arc::clone(&state),
            name: name.into(),
            latency: Duration::ZERO,
        };
        (transport, MockTransportHandle { state })
    }

    /// Delay every exchange by `latency`, like a real line would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Transport for MockTransport {
    async fn exchange(&mut self, frame: &Frame, read_window: usize) -> Result<Bytes> {
        let response = {
            let mut state = lock(&self.state);
            state.sent.push(frame.clone());
            state.windows.push(read_window);
            state.script.pop_front().unwrap_or(ScriptedResponse::Silence)
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match response {
            ScriptedResponse::Reply(bytes) => Ok(bytes.slice(..bytes.len().min(read_window))),
            ScriptedResponse::Silence => Ok(Bytes::new()),
            ScriptedResponse::Failure(message) => Err(HardwareError::serial(message)),
            ScriptedResponse::Unavailable(message) => {
                Err(HardwareError::unavailable(self.name.as_str(), message))
            }
        }
    }

    fn describe(&self) -> String {
        format!("mock {}", self.name)
    }
}

/// Handle for scripting a [`MockTransport`] and inspecting its traffic.
///
/// Cloning shares the same script.
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransportHandle {
    /// Queue a response for a future exchange.
    pub fn push(&self, response: ScriptedResponse) {
        lock(&self.state).script.push_back(response);
    }

    /// Queue raw reply bytes.
    pub fn push_reply(&self, bytes: &[u8]) {
        self.push(ScriptedResponse::Reply(Bytes::copy_from_slice(bytes)));
    }

    /// Queue an exchange where the board says nothing.
    pub fn push_silence(&self) {
        self.push(ScriptedResponse::Silence);
    }

    /// Queue a driver fault.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.push(ScriptedResponse::Failure(message.into()));
    }

    /// Queue an open failure.
    pub fn push_unavailable(&self, message: impl Into<String>) {
        self.push(ScriptedResponse::Unavailable(message.into()));
    }

    /// Frames written so far, oldest first.
    pub fn sent_frames(&self) -> Vec<Frame> {
        lock(&self.state).sent.clone()
    }

    /// Read windows requested so far, oldest first.
    pub fn read_windows(&self) -> Vec<usize> {
        lock(&self.state).windows.clone()
    }

    /// Number of exchanges performed.
    pub fn exchange_count(&self) -> usize {
        lock(&self.state).sent.len()
    }

    /// Responses still waiting in the script.
    pub fn pending(&self) -> usize {
        lock(&self.state).script.len()
    }
}

// Poisoning is ignored; every update leaves the state consistent
fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
