//! Lock controller.
//!
//! The controller owns the line to the board. Every operation takes the line
//! for the whole write, settle and read sequence, so replies can never be
//! interleaved between callers. `query_all` keeps the line for all bays.

use locker_core::{Bay, BayStatus, LockState, Result};
use locker_hardware::Transport;
use locker_protocol::{AnyCodec, Command, Decoded, Frame, FrameCodec, to_hex};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::reporter::Observation;

/// Outcome of a successful open command.
///
/// Opening is fire-and-forget: the board is not required to answer. When it
/// does echo the command, the latch it reported is kept in `acknowledged`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub bay: Bay,
    pub frame: Frame,
    pub acknowledged: Option<LockState>,
}

/// Serializes commands to one locker board.
///
/// # Examples
///
/// ```
/// use locker_controller::LockController;
/// use locker_core::{Bay, LockState};
/// use locker_hardware::{AnyTransport, BoardOptions, SimulatedBoard};
/// use locker_protocol::AnyCodec;
///
/// #[tokio::main]
/// async fn main() -> locker_core::Result<()> {
///     let codec = AnyCodec::default();
///     let (board, _handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());
///     let controller = LockController::new(AnyTransport::from(board), codec);
///
///     let bay = Bay::new(2)?;
///     controller.open(bay).await?;
///     assert_eq!(controller.query_status(bay).await, LockState::Unlocked);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct LockController<T> {
    transport: Mutex<T>,
    codec: AnyCodec,
}

impl<T: Transport> LockController<T> {
    pub fn new(transport: T, codec: AnyCodec) -> Self {
        Self {
            transport: Mutex::new(transport),
            codec,
        }
    }

    pub fn codec(&self) -> &AnyCodec {
        &self.codec
    }

    /// Description of the underlying link.
    pub async fn describe(&self) -> String {
        self.transport.lock().await.describe()
    }

    /// Release the latch of `bay`.
    ///
    /// Succeeds as soon as the frame is on the line; an empty read is not a
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns `TransportUnavailable` when the port cannot be opened and
    /// `Transport` for any other fault of the line.
    pub async fn open(&self, bay: Bay) -> Result<Delivery> {
        let frame = self.codec.encode(Command::Open, bay, &[]);

        let raw = {
            let mut transport = self.transport.lock().await;
            transport.exchange(&frame, self.codec.read_window()).await?
        };

        let acknowledged = match self.codec.decode(&raw, Command::Open, bay) {
            Decoded::Match(state) => Some(state),
            Decoded::NotAMatch => None,
        };

        info!(bay = %bay, tx = %frame, ack = ?acknowledged, "Open command sent");

        Ok(Delivery {
            bay,
            frame,
            acknowledged,
        })
    }

    /// Ask the board for the latch state of `bay`.
    ///
    /// Always produces a state. A missing or unreadable reply yields
    /// `Unknown`, as does a fault of the line, which is logged.
    pub async fn query_status(&self, bay: Bay) -> LockState {
        self.observe(bay).await.state
    }

    /// Query bays 1 through 8 in order while holding the line.
    pub async fn query_all(&self) -> Vec<BayStatus> {
        self.observe_all()
            .await
            .into_iter()
            .map(|(bay, obs)| BayStatus::new(bay, obs.state))
            .collect()
    }

    /// Like [`query_status`](Self::query_status), stamped before the line is
    /// released.
    pub async fn observe(&self, bay: Bay) -> Observation {
        let mut transport = self.transport.lock().await;
        let state = self.query_locked(&mut *transport, bay).await;
        Observation::now(state)
    }

    /// Like [`query_all`](Self::query_all), each bay stamped as it is read.
    pub async fn observe_all(&self) -> Vec<(Bay, Observation)> {
        let mut transport = self.transport.lock().await;
        let mut observed = Vec::with_capacity(locker_core::constants::BAY_COUNT);
        for bay in Bay::all() {
            let state = self.query_locked(&mut *transport, bay).await;
            observed.push((bay, Observation::now(state)));
        }
        observed
    }

    async fn query_locked(&self, transport: &mut T, bay: Bay) -> LockState {
        let frame = self.codec.encode(Command::QueryStatus, bay, &[]);

        let raw = match transport.exchange(&frame, self.codec.read_window()).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(bay = %bay, error = %e, link = %transport.describe(), "Status query failed");
                return LockState::Unknown;
            }
        };

        let state = self
            .codec
            .decode(&raw, Command::QueryStatus, bay)
            .lock_state();
        debug!(bay = %bay, rx = %to_hex(&raw), state = %state, "Status query");
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locker_core::{Error, FramingVariant};
    use locker_hardware::{MockTransport, MockTransportHandle};

    fn bay(id: u8) -> Bay {
        Bay::new(id).unwrap()
    }

    fn controller() -> (LockController<MockTransport>, MockTransportHandle) {
        let (transport, handle) = MockTransport::new();
        (LockController::new(transport, AnyCodec::default()), handle)
    }

    #[tokio::test]
    async fn test_open_without_reply_succeeds() {
        let (controller, handle) = controller();

        let delivery = controller.open(bay(5)).await.unwrap();

        assert_eq!(delivery.bay, bay(5));
        assert_eq!(delivery.acknowledged, None);
        assert_eq!(delivery.frame.to_string(), "57 4B 4C 59 09 01 82 05 86");
        assert_eq!(handle.sent_frames(), vec![delivery.frame]);
    }

    #[tokio::test]
    async fn test_open_records_acknowledgement() {
        let (controller, handle) = controller();
        handle.push_reply(
            controller
                .codec()
                .encode_reply(Command::Open, bay(3), 0x00)
                .as_bytes(),
        );

        let delivery = controller.open(bay(3)).await.unwrap();

        assert_eq!(delivery.acknowledged, Some(LockState::Unlocked));
    }

    #[tokio::test]
    async fn test_open_unavailable_port() {
        let (controller, handle) = controller();
        handle.push_unavailable("No such file or directory");

        let err = controller.open(bay(1)).await.unwrap_err();

        assert!(matches!(err, Error::TransportUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_open_line_fault() {
        let (controller, handle) = controller();
        handle.push_failure("broken pipe");

        let err = controller.open(bay(1)).await.unwrap_err();

        assert!(matches!(err, Error::Transport { .. }));
    }

    #[tokio::test]
    async fn test_query_decodes_reply() {
        let (controller, handle) = controller();
        handle.push_reply(
            controller
                .codec()
                .encode_reply(Command::QueryStatus, bay(4), 0x01)
                .as_bytes(),
        );

        assert_eq!(controller.query_status(bay(4)).await, LockState::Locked);
        assert_eq!(handle.read_windows(), vec![22]);
    }

    #[tokio::test]
    async fn test_query_silence_is_unknown() {
        let (controller, _handle) = controller();
        assert_eq!(controller.query_status(bay(2)).await, LockState::Unknown);
    }

    #[tokio::test]
    async fn test_query_line_fault_is_unknown() {
        let (controller, handle) = controller();
        handle.push_unavailable("busy");

        assert_eq!(controller.query_status(bay(2)).await, LockState::Unknown);
    }

    #[tokio::test]
    async fn test_query_reply_for_other_bay_is_unknown() {
        let (controller, handle) = controller();
        handle.push_reply(
            controller
                .codec()
                .encode_reply(Command::QueryStatus, bay(7), 0x01)
                .as_bytes(),
        );

        assert_eq!(controller.query_status(bay(6)).await, LockState::Unknown);
    }

    #[tokio::test]
    async fn test_query_all_in_order() {
        let (transport, handle) = MockTransport::new();
        let codec = AnyCodec::new(FramingVariant::Fixed, 0x01);
        for b in Bay::all() {
            handle.push_reply(codec.encode_reply(Command::QueryStatus, b, b.as_u8() % 2).as_bytes());
        }
        let controller = LockController::new(transport, codec.clone());

        let statuses = controller.query_all().await;

        let bays: Vec<u8> = statuses.iter().map(|s| s.bay.as_u8()).collect();
        assert_eq!(bays, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(statuses[0].state, LockState::Locked);
        assert_eq!(statuses[1].state, LockState::Unlocked);

        let expected: Vec<Frame> = Bay::all()
            .map(|b| codec.encode(Command::QueryStatus, b, &[]))
            .collect();
        assert_eq!(handle.sent_frames(), expected);
    }
}
