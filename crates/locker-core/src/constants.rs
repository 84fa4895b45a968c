//! Core constants for the locker board protocol.
//!
//! The board speaks two framings, selected by configuration:
//!
//! ```text
//! length-prefixed:  57 4B 4C 59 | LEN | ADDR CMD BAY [DATA..] | XOR
//!                   "WKLY"        total frame length            checksum
//!
//! fixed (legacy):   8A | ADDR BAY CMD | XOR
//! ```
//!
//! In both cases the checksum is the XOR-fold of the payload region (board
//! address through the last data byte). Header, length byte and the checksum
//! itself are excluded.
//!
//! # Usage
//!
//! ```
//! use locker_core::constants::*;
//!
//! fn is_valid_bay(id: u8) -> bool {
//!     (MIN_BAY..=MAX_BAY).contains(&id)
//! }
//!
//! assert!(is_valid_bay(1));
//! assert!(!is_valid_bay(9));
//! assert_eq!(WKLY_HEADER, *b"WKLY");
//! ```

// ============================================================================
// Bay Range
// ============================================================================

/// Lowest addressable bay on a board.
pub const MIN_BAY: u8 = 1;

/// Highest addressable bay on a board.
pub const MAX_BAY: u8 = 8;

/// Number of bays on one board.
pub const BAY_COUNT: usize = MAX_BAY as usize;

// ============================================================================
// Length-prefixed ("WKLY") framing
// ============================================================================

/// Header marker of the length-prefixed framing.
pub const WKLY_HEADER: [u8; 4] = [0x57, 0x4B, 0x4C, 0x59];

/// Unlock command code.
pub const WKLY_CMD_OPEN: u8 = 0x82;

/// Lock status query command code.
pub const WKLY_CMD_QUERY_STATUS: u8 = 0x83;

/// Status push the board emits on its own when a latch changes.
pub const WKLY_CMD_STATUS_PUSH: u8 = 0x85;

/// Status byte of a successful reply.
pub const WKLY_STATUS_OK: u8 = 0x00;

/// Length of one status reply frame:
/// header(4) + len(1) + addr, cmd, status, bay, state (5) + checksum(1).
pub const WKLY_REPLY_LEN: usize = 11;

// ============================================================================
// Fixed ("legacy") framing
// ============================================================================

/// Frame marker of the fixed 5-byte framing.
pub const FIXED_MARKER: u8 = 0x8A;

/// Unlock command code of the fixed framing.
pub const FIXED_CMD_OPEN: u8 = 0x11;

/// Status query command code of the fixed framing.
pub const FIXED_CMD_QUERY_STATUS: u8 = 0x12;

/// Length of one fixed command frame.
pub const FIXED_FRAME_LEN: usize = 5;

/// Length of one fixed status reply: marker, addr, bay, cmd, state, checksum.
pub const FIXED_REPLY_LEN: usize = 6;

// ============================================================================
// Lock state bytes
// ============================================================================

/// State byte reported for a closed latch.
pub const STATE_LOCKED: u8 = 0x01;

/// State byte reported for an open latch.
pub const STATE_UNLOCKED: u8 = 0x00;

// ============================================================================
// Defaults
// ============================================================================

/// Default board address on the bus.
pub const DEFAULT_BOARD_ADDRESS: u8 = 0x01;

/// Default serial device.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

/// Default baud rate of the board.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout of one exchange, in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Delay between writing a frame and starting to read, in milliseconds.
///
/// The board is slow to begin replying; reading earlier truncates the reply.
pub const DEFAULT_SETTLE_MS: u64 = 100;

/// Status reads capture this many reply frames worth of bytes, since the board
/// may interleave unsolicited pushes with the requested reply.
pub const READ_WINDOW_FRAMES: usize = 2;

/// Default address of the request/response server.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// Default maximum number of simultaneous client connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 32;

/// Default interval between status polls while waiting for a door to close.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_spells_wkly() {
        assert_eq!(&WKLY_HEADER, b"WKLY");
    }

    #[test]
    fn test_bay_range() {
        assert_eq!(MIN_BAY, 1);
        assert_eq!(MAX_BAY, 8);
        assert_eq!(BAY_COUNT, 8);
    }

    #[test]
    fn test_reply_lengths() {
        assert_eq!(WKLY_REPLY_LEN, WKLY_HEADER.len() + 1 + 5 + 1);
        assert_eq!(FIXED_REPLY_LEN, FIXED_FRAME_LEN + 1);
    }
}
