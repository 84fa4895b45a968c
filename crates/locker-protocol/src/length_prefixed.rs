//! Length-prefixed ("WKLY") framing.
//!
//! Command frame:
//!
//! ```text
//! 57 4B 4C 59 | LEN | ADDR CMD BAY [DATA..] | XOR
//! ```
//!
//! Reply frame (11 bytes):
//!
//! ```text
//! 57 4B 4C 59 | 0B | ADDR CMD STATUS BAY STATE | XOR
//!  0  1  2  3    4     5    6     7    8    9     10
//! ```
//!
//! `LEN` is the total frame length, header and checksum included. The
//! checksum covers `ADDR` through the last byte before it.

use bytes::{BufMut, BytesMut};
use locker_core::{Bay, FramingVariant, LockState, constants::*};
use tracing::trace;

use crate::{Command, Decoded, Frame, FrameCodec, frame::to_hex, xor_checksum};

const HEADER_LEN: usize = WKLY_HEADER.len();

/// Offset of the first payload byte (after header and length byte).
const PAYLOAD_START: usize = HEADER_LEN + 1;

/// Smallest frame that can exist: header, length, one payload byte, checksum.
const MIN_FRAME_LEN: usize = PAYLOAD_START + 2;

/// Bytes of extra data that still fit in the one-byte length field.
pub const MAX_DATA_LEN: usize = u8::MAX as usize - (PAYLOAD_START + 3 + 1);

// Reply field offsets
const REPLY_ADDR: usize = 5;
const REPLY_CMD: usize = 6;
const REPLY_BAY: usize = 8;
const REPLY_STATE: usize = 9;

/// Codec for the `WKLY` length-prefixed framing.
///
/// # Examples
///
/// ```
/// use locker_core::Bay;
/// use locker_protocol::{Command, FrameCodec, LengthPrefixedCodec};
///
/// let codec = LengthPrefixedCodec::new(0x01);
/// let frame = codec.encode(Command::QueryStatus, Bay::new(2).unwrap(), &[]);
/// assert_eq!(frame.as_bytes(), &[0x57, 0x4B, 0x4C, 0x59, 0x09, 0x01, 0x83, 0x02, 0x80]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthPrefixedCodec {
    board_address: u8,
}

impl LengthPrefixedCodec {
    pub fn new(board_address: u8) -> Self {
        Self { board_address }
    }

    /// Assemble a frame around `payload`.
    fn build(payload: &[u8]) -> Frame {
        let total = PAYLOAD_START + payload.len() + 1;
        let mut buf = BytesMut::with_capacity(total);
        buf.put_slice(&WKLY_HEADER);
        buf.put_u8(total as u8);
        buf.put_slice(payload);
        buf.put_u8(xor_checksum(payload));

        Frame::new(buf.freeze(), PAYLOAD_START..total - 1)
    }

    /// Slice out the frame that starts at `start`, if its length byte is sane
    /// and the whole frame is present.
    fn frame_at(raw: &[u8], start: usize) -> Option<&[u8]> {
        let len = usize::from(*raw.get(start + HEADER_LEN)?);
        if len < MIN_FRAME_LEN {
            return None;
        }
        raw.get(start..start.checked_add(len)?)
    }

    /// Interpret one complete, checksum-valid frame as a reply to `expected`.
    fn match_reply(&self, frame: &[u8], expected: u8, bay: Bay) -> Option<LockState> {
        if frame.len() != WKLY_REPLY_LEN {
            return None;
        }
        if frame[REPLY_ADDR] != self.board_address
            || frame[REPLY_CMD] != expected
            || frame[REPLY_BAY] != bay.as_u8()
        {
            return None;
        }
        LockState::from_state_byte(frame[REPLY_STATE])
    }
}

impl Default for LengthPrefixedCodec {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_ADDRESS)
    }
}

fn find_header(raw: &[u8]) -> Option<usize> {
    raw.windows(HEADER_LEN).position(|w| w == WKLY_HEADER)
}

fn checksum_ok(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((&checksum, body)) if body.len() >= PAYLOAD_START => {
            xor_checksum(&body[PAYLOAD_START..]) == checksum
        }
        _ => false,
    }
}

impl FrameCodec for LengthPrefixedCodec {
    fn variant(&self) -> FramingVariant {
        FramingVariant::LengthPrefixed
    }

    fn board_address(&self) -> u8 {
        self.board_address
    }

    fn command_code(&self, command: Command) -> u8 {
        match command {
            Command::Open => WKLY_CMD_OPEN,
            Command::QueryStatus => WKLY_CMD_QUERY_STATUS,
        }
    }

    /// Data beyond [`MAX_DATA_LEN`] bytes is dropped so the length byte
    /// always describes the frame.
    fn encode(&self, command: Command, bay: Bay, data: &[u8]) -> Frame {
        let data = &data[..data.len().min(MAX_DATA_LEN)];
        let mut payload = Vec::with_capacity(3 + data.len());
        payload.extend_from_slice(&[self.board_address, self.command_code(command), bay.as_u8()]);
        payload.extend_from_slice(data);
        Self::build(&payload)
    }

    fn decode(&self, raw: &[u8], expected: Command, bay: Bay) -> Decoded {
        let expected = self.command_code(expected);
        let mut pos = 0;

        while let Some(offset) = raw.get(pos..).and_then(find_header) {
            let start = pos + offset;

            let Some(frame) = Self::frame_at(raw, start).filter(|f| checksum_ok(f)) else {
                // Truncated or corrupt: resync on the next header
                pos = start + 1;
                continue;
            };

            if let Some(state) = self.match_reply(frame, expected, bay) {
                return Decoded::Match(state);
            }

            trace!(frame = %to_hex(frame), "skipping non-matching frame");
            pos = start + frame.len();
        }

        Decoded::NotAMatch
    }

    fn encode_reply(&self, command: Command, bay: Bay, state: u8) -> Frame {
        Self::build(&[
            self.board_address,
            self.command_code(command),
            WKLY_STATUS_OK,
            bay.as_u8(),
            state,
        ])
    }

    fn encode_status_push(&self, bay: Bay, state: u8) -> Frame {
        Self::build(&[
            self.board_address,
            WKLY_CMD_STATUS_PUSH,
            WKLY_STATUS_OK,
            bay.as_u8(),
            state,
        ])
    }

    fn reply_len(&self) -> usize {
        WKLY_REPLY_LEN
    }
}
