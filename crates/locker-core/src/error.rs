use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Validation errors
    #[error("Invalid bay {value}: must be 1-8")]
    InvalidBay { value: i64 },

    // Transport errors
    #[error("Serial port {port} unavailable: {message}")]
    TransportUnavailable { port: String, message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` for faults raised by the serial line rather than by
    /// local validation.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::TransportUnavailable { .. } | Error::Transport { .. } | Error::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
