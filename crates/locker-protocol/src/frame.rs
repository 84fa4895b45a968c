use bytes::Bytes;
use std::fmt;
use std::ops::Range;

/// Frame holds the exact bytes of one command or reply on the serial line.
///
/// A frame also remembers where its payload region sits (board address
/// through the last data byte), which is the region covered by the checksum.
/// The checksum itself is always the last byte.
///
/// # Wire Format
///
/// ```text
/// length-prefixed:  57 4B 4C 59 09 01 82 05 86
///                   ^^^^^^^^^^^ ^^ ^^^^^^^^ ^^
///                   header      len payload XOR
///
/// fixed:            8A 01 05 11 15
///                   ^^ ^^^^^^^^ ^^
///                   marker payload XOR
/// ```
///
/// Frames are built by a [`FrameCodec`](crate::FrameCodec):
///
/// ```
/// use locker_core::Bay;
/// use locker_protocol::{Command, FrameCodec, LengthPrefixedCodec};
///
/// let codec = LengthPrefixedCodec::new(0x01);
/// let frame = codec.encode(Command::Open, Bay::new(5).unwrap(), &[]);
///
/// assert_eq!(frame.payload(), &[0x01, 0x82, 0x05]);
/// assert_eq!(frame.checksum(), 0x86);
/// assert!(frame.verify_checksum());
/// assert_eq!(frame.to_string(), "57 4B 4C 59 09 01 82 05 86");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw bytes of the frame including header and checksum
    data: Bytes,

    /// Byte range of the checksummed payload within `data`
    payload: Range<usize>,
}

impl Frame {
    /// Create a frame from raw bytes and the range of its payload region.
    ///
    /// The range is clamped to the data so accessors never panic.
    pub fn new(data: Bytes, payload: Range<usize>) -> Self {
        let end = payload.end.min(data.len());
        let start = payload.start.min(end);
        Frame {
            data,
            payload: start..end,
        }
    }

    /// Create a Frame from a byte slice
    pub fn from_bytes(bytes: &[u8], payload: Range<usize>) -> Self {
        Self::new(Bytes::copy_from_slice(bytes), payload)
    }

    /// Get the raw bytes of the frame
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame, returning its bytes
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Get the frame size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes covered by the checksum.
    pub fn payload(&self) -> &[u8] {
        &self.data[self.payload.clone()]
    }

    /// Checksum byte carried by the frame (its last byte).
    pub fn checksum(&self) -> u8 {
        self.data.last().copied().unwrap_or(0)
    }

    /// Recompute the checksum over the payload region.
    pub fn calculate_checksum(&self) -> u8 {
        xor_checksum(self.payload())
    }

    /// Returns `true` if the carried checksum matches the payload.
    pub fn verify_checksum(&self) -> bool {
        !self.data.is_empty() && self.checksum() == self.calculate_checksum()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(&self.data))
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// XOR-fold of every byte in `bytes`.
///
/// ```
/// use locker_protocol::xor_checksum;
///
/// assert_eq!(xor_checksum(&[0x01, 0x82, 0x05]), 0x86);
/// assert_eq!(xor_checksum(&[]), 0x00);
/// ```
#[inline]
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Format bytes as space-separated upper-case hex, as they are logged.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02X}"));
    }
    out
}
