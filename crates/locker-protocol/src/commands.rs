//! Commands understood by the locker board.
//!
//! The board accepts two commands, each addressed to a single bay:
//!
//! - `Open`: pulse the latch of a bay so its door can be pulled open.
//! - `QueryStatus`: ask whether a bay's latch is currently closed.
//!
//! The byte used for each command depends on the framing variant, so the
//! numeric code is provided by the codec (see
//! [`FrameCodec::command_code`](crate::FrameCodec::command_code)), not by the
//! command itself.
//!
//! ```
//! use locker_protocol::Command;
//!
//! let cmd = Command::parse("open").unwrap();
//! assert_eq!(cmd, Command::Open);
//! assert_eq!(cmd.as_str(), "open");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Command sent to the locker board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    Open,
    QueryStatus,
}

impl Command {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Command::Open),
            "query-status" => Some(Command::QueryStatus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Open => "open",
            Command::QueryStatus => "query-status",
        }
    }

    /// Returns `true` if the command changes the physical state of a bay.
    #[inline]
    pub fn is_actuation(&self) -> bool {
        matches!(self, Command::Open)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for cmd in [Command::Open, Command::QueryStatus] {
            assert_eq!(Command::parse(cmd.as_str()), Some(cmd));
        }
        assert_eq!(Command::parse("close"), None);
    }

    #[test]
    fn test_is_actuation() {
        assert!(Command::Open.is_actuation());
        assert!(!Command::QueryStatus.is_actuation());
    }
}
