//! Frame codecs for the locker board protocol.
//!
//! The board has shipped with two incompatible wire formats. Both are
//! implemented behind the [`FrameCodec`] trait and the active one is chosen by
//! configuration through [`AnyCodec`]:
//!
//! - [`LengthPrefixedCodec`]: `WKLY` header, length byte, payload, checksum.
//! - [`FixedFrameCodec`]: legacy 5-byte frame with a single marker byte.
//!
//! # Encoding
//!
//! Encoding is pure and infallible: the same command, bay and data always
//! produce the same bytes.
//!
//! # Decoding
//!
//! The serial line is treated as an unreliable stream. A reply buffer may hold
//! nothing, a truncated reply, unsolicited status pushes, several frames back
//! to back, or line noise. [`FrameCodec::decode`] therefore scans the whole
//! buffer for the first frame that
//!
//! 1. starts with the variant's header,
//! 2. carries a valid checksum,
//! 3. comes from the configured board address,
//! 4. echoes the expected command and bay,
//!
//! and reports its state byte. Anything else yields [`Decoded::NotAMatch`].
//! Decoding never panics, whatever the input.
//!
//! ```
//! use locker_core::{Bay, FramingVariant, LockState};
//! use locker_protocol::{AnyCodec, Command, Decoded, FrameCodec};
//!
//! let codec = AnyCodec::new(FramingVariant::LengthPrefixed, 0x01);
//! let bay = Bay::new(3).unwrap();
//!
//! // An unsolicited push for bay 3 followed by the real reply
//! let mut buffer = codec.encode_status_push(bay, 0x00).as_bytes().to_vec();
//! buffer.extend_from_slice(codec.encode_reply(Command::QueryStatus, bay, 0x01).as_bytes());
//!
//! assert_eq!(
//!     codec.decode(&buffer, Command::QueryStatus, bay),
//!     Decoded::Match(LockState::Locked)
//! );
//! assert_eq!(codec.decode(&[], Command::QueryStatus, bay), Decoded::NotAMatch);
//! ```

use locker_core::{Bay, FramingVariant, LockState, ProtocolConfig, constants::READ_WINDOW_FRAMES};

use crate::{Command, FixedFrameCodec, Frame, LengthPrefixedCodec};

/// Result of scanning a reply buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A matching, checksum-valid reply reported this state.
    Match(LockState),

    /// No usable reply for the expected command and bay.
    NotAMatch,
}

impl Decoded {
    /// Collapse into a lock state; `NotAMatch` becomes `Unknown`.
    pub fn lock_state(self) -> LockState {
        match self {
            Decoded::Match(state) => state,
            Decoded::NotAMatch => LockState::Unknown,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Decoded::Match(_))
    }
}

/// Encoder/decoder for one framing variant.
pub trait FrameCodec {
    /// Framing variant implemented by this codec.
    fn variant(&self) -> FramingVariant;

    /// Board address written into, and expected back from, every frame.
    fn board_address(&self) -> u8;

    /// Wire byte for `command` in this framing.
    fn command_code(&self, command: Command) -> u8;

    /// Build the frame for `command` addressed to `bay`.
    ///
    /// `data` is appended to the payload; current commands send none.
    fn encode(&self, command: Command, bay: Bay, data: &[u8]) -> Frame;

    /// Scan `raw` for the reply to `expected` on `bay`.
    fn decode(&self, raw: &[u8], expected: Command, bay: Bay) -> Decoded;

    /// Build the reply the board sends for `command` on `bay`.
    ///
    /// Used by simulated boards and tests. `state` is the raw state byte, so
    /// replies with bytes the board never sends can be produced too.
    fn encode_reply(&self, command: Command, bay: Bay, state: u8) -> Frame;

    /// Build a status frame the board emits without being asked.
    fn encode_status_push(&self, bay: Bay, state: u8) -> Frame;

    /// Length in bytes of one reply frame.
    fn reply_len(&self) -> usize;

    /// Bytes to read after a command so that a reply interleaved with
    /// unsolicited frames is still captured.
    fn read_window(&self) -> usize {
        self.reply_len() * READ_WINDOW_FRAMES
    }
}

/// Codec selected at runtime from configuration.
///
/// # Examples
///
/// ```
/// use locker_core::{Bay, FramingVariant};
/// use locker_protocol::{AnyCodec, Command, FrameCodec};
///
/// let codec = AnyCodec::new(FramingVariant::Fixed, 0x01);
/// let frame = codec.encode(Command::Open, Bay::new(1).unwrap(), &[]);
/// assert_eq!(frame.as_bytes(), &[0x8A, 0x01, 0x01, 0x11, 0x11]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyCodec {
    LengthPrefixed(LengthPrefixedCodec),
    Fixed(FixedFrameCodec),
}

impl AnyCodec {
    pub fn new(variant: FramingVariant, board_address: u8) -> Self {
        match variant {
            FramingVariant::LengthPrefixed => {
                AnyCodec::LengthPrefixed(LengthPrefixedCodec::new(board_address))
            }
            FramingVariant::Fixed => AnyCodec::Fixed(FixedFrameCodec::new(board_address)),
        }
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(config.framing, config.board_address)
    }
}

impl Default for AnyCodec {
    fn default() -> Self {
        Self::from_config(&ProtocolConfig::default())
    }
}

impl FrameCodec for AnyCodec {
    fn variant(&self) -> FramingVariant {
        match self {
            Self::LengthPrefixed(codec) => codec.variant(),
            Self::Fixed(codec) => codec.variant(),
        }
    }

    fn board_address(&self) -> u8 {
        match self {
            Self::LengthPrefixed(codec) => codec.board_address(),
            Self::Fixed(codec) => codec.board_address(),
        }
    }

    fn command_code(&self, command: Command) -> u8 {
        match self {
            Self::LengthPrefixed(codec) => codec.command_code(command),
            Self::Fixed(codec) => codec.command_code(command),
        }
    }

    fn encode(&self, command: Command, bay: Bay, data: &[u8]) -> Frame {
        match self {
            Self::LengthPrefixed(codec) => codec.encode(command, bay, data),
            Self::Fixed(codec) => codec.encode(command, bay, data),
        }
    }

    fn decode(&self, raw: &[u8], expected: Command, bay: Bay) -> Decoded {
        match self {
            Self::LengthPrefixed(codec) => codec.decode(raw, expected, bay),
            Self::Fixed(codec) => codec.decode(raw, expected, bay),
        }
    }

    fn encode_reply(&self, command: Command, bay: Bay, state: u8) -> Frame {
        match self {
            Self::LengthPrefixed(codec) => codec.encode_reply(command, bay, state),
            Self::Fixed(codec) => codec.encode_reply(command, bay, state),
        }
    }

    fn encode_status_push(&self, bay: Bay, state: u8) -> Frame {
        match self {
            Self::LengthPrefixed(codec) => codec.encode_status_push(bay, state),
            Self::Fixed(codec) => codec.encode_status_push(bay, state),
        }
    }

    fn reply_len(&self) -> usize {
        match self {
            Self::LengthPrefixed(codec) => codec.reply_len(),
            Self::Fixed(codec) => codec.reply_len(),
        }
    }
}
