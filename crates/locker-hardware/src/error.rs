//! Error types for serial transport operations.
//!
//! Only genuine hardware or driver faults are errors here. A board that stays
//! quiet is not a failure: the exchange succeeds with zero bytes read.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while exchanging frames with the board.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The serial port could not be opened (missing device, permissions, busy).
    #[error("Serial port {port} unavailable: {message}")]
    Unavailable { port: String, message: String },

    /// The serial driver reported a fault after the port was opened.
    #[error("Serial error: {message}")]
    Serial { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new unavailable-port error.
    pub fn unavailable(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a new serial driver error.
    pub fn serial(message: impl Into<String>) -> Self {
        Self::Serial {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<serialport::Error> for HardwareError {
    fn from(err: serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::Io(kind) => {
                Self::Io(std::io::Error::new(kind, err.description))
            }
            _ => Self::serial(err.description),
        }
    }
}

impl From<HardwareError> for locker_core::Error {
    fn from(err: HardwareError) -> Self {
        match err {
            HardwareError::Unavailable { port, message } => {
                locker_core::Error::TransportUnavailable { port, message }
            }
            other => locker_core::Error::Transport {
                message: other.to_string(),
            },
        }
    }
}
