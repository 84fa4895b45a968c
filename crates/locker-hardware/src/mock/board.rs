//! In-process emulation of a locker control board.
//!
//! The board recognizes the frames the codec produces, keeps a latch per bay,
//! and answers like the hardware does: status queries get a reply frame,
//! optionally preceded by an unsolicited status push for another bay. An
//! opened door closes again by itself after a number of status polls, which
//! is what a user shutting the door looks like from the host side.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::{Bytes, BytesMut};
use locker_core::constants::BAY_COUNT;
use locker_core::{Bay, LockState};
use locker_protocol::{AnyCodec, Command, Frame, FrameCodec};
use tracing::debug;

use crate::error::{HardwareError, Result};
use crate::traits::Transport;

const STATE_JAMMED: u8 = 0x02;

/// Behavior switches for a [`SimulatedBoard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardOptions {
    /// Echo an acknowledgement frame after opening a bay.
    pub acknowledge_open: bool,

    /// Put a status push for the next bay in front of every query reply.
    pub interleave_pushes: bool,

    /// Status polls after which an opened door latches again. `None` keeps
    /// doors open until changed through the handle.
    pub auto_close_after: Option<u32>,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            acknowledge_open: false,
            interleave_pushes: true,
            auto_close_after: Some(2),
        }
    }
}

#[derive(Debug)]
struct BoardState {
    latches: [LockState; BAY_COUNT],
    polls_since_open: [Option<u32>; BAY_COUNT],
    opened: Vec<Bay>,
    unrecognized: usize,
    offline: bool,
}

impl BoardState {
    fn new() -> Self {
        Self {
            latches: [LockState::Locked; BAY_COUNT],
            polls_since_open: [None; BAY_COUNT],
            opened: Vec::new(),
            unrecognized: 0,
            offline: false,
        }
    }
}

/// Simulated locker board speaking the configured framing.
///
/// All bays start locked.
///
/// # Examples
///
/// ```
/// use locker_core::{Bay, LockState};
/// use locker_hardware::{BoardOptions, SimulatedBoard, Transport};
/// use locker_protocol::{AnyCodec, Command, FrameCodec};
///
/// #[tokio::main]
/// async fn main() -> locker_hardware::Result<()> {
///     let codec = AnyCodec::default();
///     let (mut board, handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());
///     let bay = Bay::new(3).unwrap();
///
///     board.exchange(&codec.encode(Command::Open, bay, &[]), codec.read_window()).await?;
///     assert_eq!(handle.state(bay), LockState::Unlocked);
///
///     let raw = board
///         .exchange(&codec.encode(Command::QueryStatus, bay, &[]), codec.read_window())
///         .await?;
///     assert_eq!(codec.decode(&raw, Command::QueryStatus, bay).lock_state(), LockState::Unlocked);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct SimulatedBoard {
    codec: AnyCodec,
    options: BoardOptions,
    state: Arc<Mutex<BoardState>>,
}

impl SimulatedBoard {
    /// Create a board and the handle that inspects and drives it.
    pub fn new(codec: AnyCodec, options: BoardOptions) -> (Self, SimulatedBoardHandle) {
        let state = Arc::new(Mutex::new(BoardState::new()));
        let board = Self {
            codec,
            options,
            state: Arc::clone(&state),
        };
        (board, SimulatedBoardHandle { state })
    }

    fn recognize(&self, raw: &[u8]) -> Option<(Command, Bay)> {
        [Command::Open, Command::QueryStatus]
            .into_iter()
            .flat_map(|command| Bay::all().map(move |bay| (command, bay)))
            .find(|&(command, bay)| self.codec.encode(command, bay, &[]).as_bytes() == raw)
    }

    fn handle_open(&self, state: &mut BoardState, bay: Bay) -> Vec<Frame> {
        state.latches[bay.index()] = LockState::Unlocked;
        state.polls_since_open[bay.index()] = Some(0);
        state.opened.push(bay);
        debug!(bay = %bay, "Simulated board released latch");

        if self.options.acknowledge_open {
            vec![self.codec.encode_reply(Command::Open, bay, state_byte(LockState::Unlocked))]
        } else {
            Vec::new()
        }
    }

    fn handle_query(&self, state: &mut BoardState, bay: Bay) -> Vec<Frame> {
        let index = bay.index();
        if let (Some(polls), Some(limit)) = (state.polls_since_open[index], self.options.auto_close_after) {
            if polls >= limit {
                state.latches[index] = LockState::Locked;
                state.polls_since_open[index] = None;
                debug!(bay = %bay, "Simulated door closed");
            } else {
                state.polls_since_open[index] = Some(polls + 1);
            }
        }

        let mut frames = Vec::with_capacity(2);
        if self.options.interleave_pushes {
            let neighbour = Bay::all()
                .find(|b| b.index() == (index + 1) % BAY_COUNT)
                .unwrap_or(bay);
            frames.push(
                self.codec
                    .encode_status_push(neighbour, state_byte(state.latches[neighbour.index()])),
            );
        }
        frames.push(
            self.codec
                .encode_reply(Command::QueryStatus, bay, state_byte(state.latches[index])),
        );
        frames
    }
}

impl Transport for SimulatedBoard {
    async fn exchange(&mut self, frame: &Frame, read_window: usize) -> Result<Bytes> {
        let frames = {
            let mut state = lock(&self.state);
            if state.offline {
                return Err(HardwareError::unavailable("simulated", "board is offline"));
            }

            match self.recognize(frame.as_bytes()) {
                Some((Command::Open, bay)) => self.handle_open(&mut state, bay),
                Some((Command::QueryStatus, bay)) => self.handle_query(&mut state, bay),
                None => {
                    state.unrecognized += 1;
                    debug!(tx = %frame, "Simulated board ignored frame");
                    Vec::new()
                }
            }
        };

        let mut out = BytesMut::new();
        for reply in &frames {
            out.extend_from_slice(reply.as_bytes());
        }
        out.truncate(read_window);
        Ok(out.freeze())
    }

    fn describe(&self) -> String {
        format!("simulated {} board", self.codec.variant())
    }
}

/// Handle for inspecting and steering a [`SimulatedBoard`].
#[derive(Debug, Clone)]
pub struct SimulatedBoardHandle {
    state: Arc<Mutex<BoardState>>,
}

impl SimulatedBoardHandle {
    /// Current latch of `bay`.
    pub fn state(&self, bay: Bay) -> LockState {
        lock(&self.state).latches[bay.index()]
    }

    /// Force the latch of `bay`. `Unknown` makes the board report a state
    /// byte no host understands, like a jammed sensor.
    pub fn set_state(&self, bay: Bay, latch: LockState) {
        let mut state = lock(&self.state);
        state.latches[bay.index()] = latch;
        state.polls_since_open[bay.index()] = None;
    }

    /// Bays opened so far, oldest first.
    pub fn opened(&self) -> Vec<Bay> {
        lock(&self.state).opened.clone()
    }

    /// Frames received that the board did not understand.
    pub fn unrecognized(&self) -> usize {
        lock(&self.state).unrecognized
    }

    /// Take the board off the line, or put it back.
    pub fn set_offline(&self, offline: bool) {
        lock(&self.state).offline = offline;
    }
}

fn state_byte(latch: LockState) -> u8 {
    latch.to_state_byte().unwrap_or(STATE_JAMMED)
}

fn lock(state: &Mutex<BoardState>) -> MutexGuard<'_, BoardState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use locker_core::FramingVariant;
    use locker_protocol::Decoded;
    use rstest::rstest;

    fn bay(id: u8) -> Bay {
        Bay::new(id).unwrap()
    }

    async fn query(board: &mut SimulatedBoard, codec: &AnyCodec, bay: Bay) -> LockState {
        let raw = board
            .exchange(&codec.encode(Command::QueryStatus, bay, &[]), codec.read_window())
            .await
            .unwrap();
        codec.decode(&raw, Command::QueryStatus, bay).lock_state()
    }

    #[rstest]
    #[case(FramingVariant::LengthPrefixed)]
    #[case(FramingVariant::Fixed)]
    #[tokio::test]
    async fn test_all_bays_start_locked(#[case] variant: FramingVariant) {
        let codec = AnyCodec::new(variant, 0x01);
        let (mut board, _handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());

        for b in Bay::all() {
            assert_eq!(query(&mut board, &codec, b).await, LockState::Locked);
        }
    }

    #[tokio::test]
    async fn test_query_reply_follows_push() {
        let codec = AnyCodec::default();
        let (mut board, handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());
        handle.set_state(bay(2), LockState::Unlocked);

        let raw = board
            .exchange(&codec.encode(Command::QueryStatus, bay(1), &[]), codec.read_window())
            .await
            .unwrap();

        assert_eq!(raw.len(), codec.read_window());
        // The push for bay 2 comes first and must not be taken as the reply
        assert_eq!(codec.decode(&raw, Command::QueryStatus, bay(1)), Decoded::Match(LockState::Locked));
    }

    #[tokio::test]
    async fn test_open_then_door_closes_after_polls() {
        let codec = AnyCodec::default();
        let (mut board, handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());

        let raw = board
            .exchange(&codec.encode(Command::Open, bay(5), &[]), codec.read_window())
            .await
            .unwrap();
        assert!(raw.is_empty());
        assert_eq!(handle.opened(), vec![bay(5)]);

        assert_eq!(query(&mut board, &codec, bay(5)).await, LockState::Unlocked);
        assert_eq!(query(&mut board, &codec, bay(5)).await, LockState::Unlocked);
        assert_eq!(query(&mut board, &codec, bay(5)).await, LockState::Locked);
    }

    #[tokio::test]
    async fn test_door_stays_open_without_auto_close() {
        let codec = AnyCodec::default();
        let options = BoardOptions {
            auto_close_after: None,
            ..BoardOptions::default()
        };
        let (mut board, _handle) = SimulatedBoard::new(codec.clone(), options);

        board
            .exchange(&codec.encode(Command::Open, bay(1), &[]), codec.read_window())
            .await
            .unwrap();

        for _ in 0..5 {
            assert_eq!(query(&mut board, &codec, bay(1)).await, LockState::Unlocked);
        }
    }

    #[tokio::test]
    async fn test_open_acknowledged() {
        let codec = AnyCodec::default();
        let options = BoardOptions {
            acknowledge_open: true,
            ..BoardOptions::default()
        };
        let (mut board, _handle) = SimulatedBoard::new(codec.clone(), options);

        let raw = board
            .exchange(&codec.encode(Command::Open, bay(7), &[]), codec.read_window())
            .await
            .unwrap();

        assert_eq!(codec.decode(&raw, Command::Open, bay(7)), Decoded::Match(LockState::Unlocked));
    }

    #[tokio::test]
    async fn test_jammed_bay_is_unknown() {
        let codec = AnyCodec::default();
        let (mut board, handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());
        handle.set_state(bay(4), LockState::Unknown);

        assert_eq!(query(&mut board, &codec, bay(4)).await, LockState::Unknown);
    }

    #[tokio::test]
    async fn test_foreign_frame_is_ignored() {
        let codec = AnyCodec::default();
        let (mut board, handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());
        let other_board = AnyCodec::new(FramingVariant::LengthPrefixed, 0x07);

        let raw = board
            .exchange(&other_board.encode(Command::Open, bay(1), &[]), codec.read_window())
            .await
            .unwrap();

        assert!(raw.is_empty());
        assert_eq!(handle.unrecognized(), 1);
        assert_eq!(handle.state(bay(1)), LockState::Locked);
    }

    #[tokio::test]
    async fn test_offline_board_is_unavailable() {
        let codec = AnyCodec::default();
        let (mut board, handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());
        handle.set_offline(true);

        let result = board
            .exchange(&codec.encode(Command::QueryStatus, bay(1), &[]), codec.read_window())
            .await;

        assert!(matches!(result, Err(HardwareError::Unavailable { .. })));
    }
}
