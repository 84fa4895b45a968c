//! Configuration parsing for the locker daemon.
//!
//! Configuration lives in a single TOML file. Every section and field is
//! optional; omitted values fall back to the defaults in [`crate::constants`].
//!
//! ```
//! use locker_core::{FramingVariant, LockerConfig};
//!
//! let config = LockerConfig::from_toml(r#"
//!     [serial]
//!     port = "/dev/ttyS1"
//!
//!     [protocol]
//!     framing = "fixed"
//! "#).unwrap();
//!
//! assert_eq!(config.serial.port, "/dev/ttyS1");
//! assert_eq!(config.serial.baud_rate, 9600);
//! assert_eq!(config.protocol.framing, FramingVariant::Fixed);
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::{Error, FramingVariant, Result};

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockerConfig {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LockerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the TOML is invalid or a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check values serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            return Err(Error::Config("serial.port must not be empty".to_string()));
        }
        if self.serial.baud_rate == 0 {
            return Err(Error::Config("serial.baud_rate must be positive".to_string()));
        }
        if self.serial.read_timeout_ms == 0 {
            return Err(Error::Config(
                "serial.read_timeout_ms must be positive".to_string(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(Error::Config(
                "server.max_connections must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serial line settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    /// Serial device path (e.g. `/dev/ttyUSB0`, `COM3`).
    pub port: String,

    pub baud_rate: u32,

    /// Upper bound on waiting for reply bytes in one exchange.
    pub read_timeout_ms: u64,

    /// Delay between writing a command and reading its reply.
    pub settle_ms: u64,
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

/// Board protocol settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    pub framing: FramingVariant,

    /// Address of the board on the bus.
    pub board_address: u8,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            framing: FramingVariant::default(),
            board_address: DEFAULT_BOARD_ADDRESS,
        }
    }
}

/// Request/response server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,

    /// Maximum number of simultaneous client connections.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 5000))),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `locker_protocol=debug`.
    pub level: String,

    /// Append logs to this file instead of stdout.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = LockerConfig::from_toml("").unwrap();
        assert_eq!(config, LockerConfig::default());
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.serial.settle(), Duration::from_millis(100));
        assert_eq!(config.protocol.framing, FramingVariant::LengthPrefixed);
        assert_eq!(config.protocol.board_address, 0x01);
        assert_eq!(config.server.bind_addr.port(), 5000);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            [serial]
            port = "COM3"
            baud_rate = 19200
            read_timeout_ms = 1500
            settle_ms = 50

            [protocol]
            framing = "fixed"
            board_address = 2

            [server]
            bind_addr = "0.0.0.0:8080"
            max_connections = 4

            [logging]
            level = "debug"
            file = "/var/log/lockerd.log"
        "#;

        let config = LockerConfig::from_toml(toml).unwrap();
        assert_eq!(config.serial.port, "COM3");
        assert_eq!(config.serial.baud_rate, 19200);
        assert_eq!(config.serial.settle_ms, 50);
        assert_eq!(config.protocol.framing, FramingVariant::Fixed);
        assert_eq!(config.protocol.board_address, 2);
        assert_eq!(config.server.bind_addr.port(), 8080);
        assert_eq!(config.server.max_connections, 4);
        assert_eq!(
            config.logging.file.as_deref(),
            Some(Path::new("/var/log/lockerd.log"))
        );
    }

    #[rstest]
    #[case("[serial]\nport = \"\"")]
    #[case("[serial]\nbaud_rate = 0")]
    #[case("[serial]\nread_timeout_ms = 0")]
    #[case("[server]\nmax_connections = 0")]
    #[case("[protocol]\nframing = \"wkly\"")]
    #[case("[protocol]\nboard_address = 300")]
    #[case("[serial]\nparity = \"even\"")]
    fn test_invalid_config(#[case] toml: &str) {
        let result = LockerConfig::from_toml(toml);
        assert!(matches!(result, Err(Error::Config(_))), "accepted: {toml}");
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = LockerConfig::default();
        config.protocol.framing = FramingVariant::Fixed;
        config.logging.file = Some(PathBuf::from("locker.log"));

        let text = config.to_toml().unwrap();
        let parsed = LockerConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[serial]\nport = \"/dev/ttyAMA0\"").unwrap();

        let config = LockerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyAMA0");
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let text = include_str!("../../../lockerd.example.toml");
        assert_eq!(LockerConfig::from_toml(text).unwrap(), LockerConfig::default());
    }

    #[test]
    fn test_from_missing_file() {
        let result = LockerConfig::from_file(Path::new("/nonexistent/lockerd.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
