//! Fixed 5-byte ("legacy") framing used by earlier boards.
//!
//! Command frame:
//!
//! ```text
//! 8A | ADDR BAY CMD | XOR
//! ```
//!
//! Reply frame: the command echoed back with the state byte appended.
//!
//! ```text
//! 8A | ADDR BAY CMD STATE | XOR
//!  0     1    2   3    4     5
//! ```
//!
//! There is no length field, so frames are recognised by the marker byte and
//! a valid checksum.

use bytes::{BufMut, BytesMut};
use locker_core::{Bay, FramingVariant, LockState, constants::*};
use tracing::trace;

use crate::{Command, Decoded, Frame, FrameCodec, frame::to_hex, xor_checksum};

// Reply field offsets
const REPLY_ADDR: usize = 1;
const REPLY_BAY: usize = 2;
const REPLY_CMD: usize = 3;
const REPLY_STATE: usize = 4;
const REPLY_CHECKSUM: usize = 5;

/// Codec for the fixed 5-byte framing.
///
/// # Examples
///
/// ```
/// use locker_core::Bay;
/// use locker_protocol::{Command, FixedFrameCodec, FrameCodec};
///
/// let codec = FixedFrameCodec::new(0x01);
/// let frame = codec.encode(Command::Open, Bay::new(5).unwrap(), &[]);
/// assert_eq!(frame.as_bytes(), &[0x8A, 0x01, 0x05, 0x11, 0x15]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFrameCodec {
    board_address: u8,
}

impl FixedFrameCodec {
    pub fn new(board_address: u8) -> Self {
        Self { board_address }
    }

    fn build(payload: &[u8]) -> Frame {
        let mut buf = BytesMut::with_capacity(payload.len() + 2);
        buf.put_u8(FIXED_MARKER);
        buf.put_slice(payload);
        buf.put_u8(xor_checksum(payload));

        let end = buf.len() - 1;
        Frame::new(buf.freeze(), 1..end)
    }

    fn match_reply(&self, frame: &[u8], expected: u8, bay: Bay) -> Option<LockState> {
        if frame[REPLY_ADDR] != self.board_address
            || frame[REPLY_BAY] != bay.as_u8()
            || frame[REPLY_CMD] != expected
        {
            return None;
        }
        LockState::from_state_byte(frame[REPLY_STATE])
    }
}

impl Default for FixedFrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_ADDRESS)
    }
}

impl FrameCodec for FixedFrameCodec {
    fn variant(&self) -> FramingVariant {
        FramingVariant::Fixed
    }

    fn board_address(&self) -> u8 {
        self.board_address
    }

    fn command_code(&self, command: Command) -> u8 {
        match command {
            Command::Open => FIXED_CMD_OPEN,
            Command::QueryStatus => FIXED_CMD_QUERY_STATUS,
        }
    }

    /// The fixed framing has no room for extra data, so `data` is ignored.
    fn encode(&self, command: Command, bay: Bay, _data: &[u8]) -> Frame {
        Self::build(&[self.board_address, bay.as_u8(), self.command_code(command)])
    }

    fn decode(&self, raw: &[u8], expected: Command, bay: Bay) -> Decoded {
        let expected = self.command_code(expected);
        let mut pos = 0;

        while let Some(offset) = raw
            .get(pos..)
            .and_then(|rest| rest.iter().position(|&b| b == FIXED_MARKER))
        {
            let start = pos + offset;

            let candidate = raw
                .get(start..start + FIXED_REPLY_LEN)
                .filter(|f| xor_checksum(&f[REPLY_ADDR..REPLY_CHECKSUM]) == f[REPLY_CHECKSUM]);

            let Some(frame) = candidate else {
                pos = start + 1;
                continue;
            };

            if let Some(state) = self.match_reply(frame, expected, bay) {
                return Decoded::Match(state);
            }

            trace!(frame = %to_hex(frame), "skipping non-matching frame");
            pos = start + FIXED_REPLY_LEN;
        }

        Decoded::NotAMatch
    }

    fn encode_reply(&self, command: Command, bay: Bay, state: u8) -> Frame {
        Self::build(&[
            self.board_address,
            bay.as_u8(),
            self.command_code(command),
            state,
        ])
    }

    /// The fixed board reports latch changes by replaying an `Open` echo for
    /// the bay.
    fn encode_status_push(&self, bay: Bay, state: u8) -> Frame {
        self.encode_reply(Command::Open, bay, state)
    }

    fn reply_len(&self) -> usize {
        FIXED_REPLY_LEN
    }
}
