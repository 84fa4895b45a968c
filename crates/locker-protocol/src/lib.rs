pub mod codec;
pub mod commands;
pub mod fixed;
pub mod frame;
pub mod length_prefixed;

pub use codec::{AnyCodec, Decoded, FrameCodec};
pub use commands::Command;
pub use fixed::FixedFrameCodec;
pub use frame::{Frame, to_hex, xor_checksum};
pub use length_prefixed::LengthPrefixedCodec;
