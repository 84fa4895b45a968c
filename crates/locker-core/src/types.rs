use crate::{
    Result,
    constants::{MAX_BAY, MIN_BAY, STATE_LOCKED, STATE_UNLOCKED},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Locker bay identifier (1-8).
///
/// A `Bay` can only be obtained through validation, so every protocol
/// operation that takes one is guaranteed an in-range identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Bay(u8);

impl Bay {
    /// Create a new bay with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidBay` if the ID is outside the valid range (1-8).
    pub fn new(id: u8) -> Result<Self> {
        if !(MIN_BAY..=MAX_BAY).contains(&id) {
            return Err(Error::InvalidBay {
                value: i64::from(id),
            });
        }
        Ok(Bay(id))
    }

    /// Get the raw bay number as u8.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Zero-based position of the bay, for indexing per-bay tables.
    #[must_use]
    pub fn index(&self) -> usize {
        usize::from(self.0 - MIN_BAY)
    }

    /// All bays of a board, in ascending order.
    pub fn all() -> impl Iterator<Item = Bay> {
        (MIN_BAY..=MAX_BAY).map(Bay)
    }
}

impl fmt::Display for Bay {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Bay {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u8::try_from(value)
            .map_err(|_| Error::InvalidBay { value })
            .and_then(Bay::new)
    }
}

impl From<Bay> for u8 {
    fn from(bay: Bay) -> Self {
        bay.0
    }
}

impl std::str::FromStr for Bay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s.trim().parse().map_err(|_| {
            Error::Config(format!("Bay must be a number, got {s:?}"))
        })?;
        Bay::try_from(value)
    }
}

/// Physical state of a bay's latch as last reported by the board.
///
/// `Unknown` is the "no confident answer" outcome: no reply, a truncated or
/// corrupted reply, or a reply for another command or bay. It is a value,
/// not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LockState {
    Locked,
    Unlocked,
    Unknown,
}

impl LockState {
    /// Interpret a reply state byte.
    ///
    /// Returns `None` for bytes the board is not known to send.
    #[inline]
    pub fn from_state_byte(byte: u8) -> Option<Self> {
        match byte {
            STATE_LOCKED => Some(LockState::Locked),
            STATE_UNLOCKED => Some(LockState::Unlocked),
            _ => None,
        }
    }

    /// State byte the board uses for this state, if any.
    #[inline]
    #[must_use]
    pub fn to_state_byte(self) -> Option<u8> {
        match self {
            LockState::Locked => Some(STATE_LOCKED),
            LockState::Unlocked => Some(STATE_UNLOCKED),
            LockState::Unknown => None,
        }
    }

    /// Returns `true` if the board gave a definite answer.
    #[inline]
    #[must_use]
    pub fn is_known(self) -> bool {
        !matches!(self, LockState::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LockState::Locked => "LOCKED",
            LockState::Unlocked => "UNLOCKED",
            LockState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bay together with its observed state.
///
/// Serialized as `{"channel": 3, "status": "LOCKED"}`, the shape the kiosk
/// frontend consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BayStatus {
    #[serde(rename = "channel")]
    pub bay: Bay,
    #[serde(rename = "status")]
    pub state: LockState,
}

impl BayStatus {
    pub fn new(bay: Bay, state: LockState) -> Self {
        Self { bay, state }
    }
}

/// Wire framing spoken by the locker board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FramingVariant {
    /// `WKLY` header, length byte, payload, checksum.
    #[default]
    LengthPrefixed,
    /// Legacy 5-byte frame with a single marker byte and no length field.
    Fixed,
}

impl fmt::Display for FramingVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FramingVariant::LengthPrefixed => write!(f, "length-prefixed"),
            FramingVariant::Fixed => write!(f, "fixed"),
        }
    }
}

impl std::str::FromStr for FramingVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "length-prefixed" => Ok(FramingVariant::LengthPrefixed),
            "fixed" => Ok(FramingVariant::Fixed),
            other => Err(Error::Config(format!(
                "Unknown framing variant {other:?} (expected \"length-prefixed\" or \"fixed\")"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(5)]
    #[case(8)]
    fn test_bay_valid(#[case] id: u8) {
        let bay = Bay::new(id).unwrap();
        assert_eq!(bay.as_u8(), id);
        assert_eq!(bay.index(), usize::from(id - 1));
    }

    #[rstest]
    #[case(0)]
    #[case(9)]
    #[case(255)]
    fn test_bay_invalid(#[case] id: u8) {
        let result = Bay::new(id);
        assert!(matches!(result, Err(Error::InvalidBay { value }) if value == i64::from(id)));
    }

    #[rstest]
    #[case(-1)]
    #[case(0)]
    #[case(9)]
    #[case(256)]
    #[case(i64::MAX)]
    fn test_bay_try_from_out_of_range(#[case] value: i64) {
        let result = Bay::try_from(value);
        assert!(matches!(result, Err(Error::InvalidBay { value: v }) if v == value));
    }

    #[rstest]
    #[case("3", 3)]
    #[case(" 8 ", 8)]
    fn test_bay_from_str(#[case] input: &str, #[case] expected: u8) {
        let bay: Bay = input.parse().unwrap();
        assert_eq!(bay.as_u8(), expected);
    }

    #[test]
    fn test_bay_from_str_rejects_garbage() {
        assert!(matches!("abc".parse::<Bay>(), Err(Error::Config(_))));
        assert!(matches!("12".parse::<Bay>(), Err(Error::InvalidBay { .. })));
    }

    #[test]
    fn test_bay_all_is_ordered() {
        let ids: Vec<u8> = Bay::all().map(|b| b.as_u8()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_lock_state_bytes() {
        assert_eq!(LockState::from_state_byte(1), Some(LockState::Locked));
        assert_eq!(LockState::from_state_byte(0), Some(LockState::Unlocked));
        assert_eq!(LockState::from_state_byte(2), None);
        assert_eq!(LockState::Locked.to_state_byte(), Some(1));
        assert_eq!(LockState::Unknown.to_state_byte(), None);
        assert!(!LockState::Unknown.is_known());
    }

    #[test]
    fn test_bay_status_wire_shape() {
        let status = BayStatus::new(Bay::new(3).unwrap(), LockState::Locked);
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"{"channel":3,"status":"LOCKED"}"#);

        let back: BayStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn test_bay_deserialize_rejects_out_of_range() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[allow(dead_code)]
            bay: Bay,
        }
        assert!(toml::from_str::<Wrapper>("bay = 0").is_err());
        assert!(toml::from_str::<Wrapper>("bay = 9").is_err());
        assert!(toml::from_str::<Wrapper>("bay = 4").is_ok());
    }

    #[rstest]
    #[case("length-prefixed", FramingVariant::LengthPrefixed)]
    #[case("fixed", FramingVariant::Fixed)]
    fn test_framing_variant_parse(#[case] input: &str, #[case] expected: FramingVariant) {
        let parsed: FramingVariant = input.parse().unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), input);
    }

    #[test]
    fn test_framing_variant_default() {
        assert_eq!(FramingVariant::default(), FramingVariant::LengthPrefixed);
        assert!("wkly".parse::<FramingVariant>().is_err());
    }
}
