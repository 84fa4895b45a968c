//! Request and response messages.
//!
//! One JSON object per line in each direction. Requests name their operation
//! in `op`; responses carry an HTTP-style `code` next to `success`.
//!
//! ```text
//! -> {"op":"open-locker","lockerId":5}
//! <- {"code":200,"success":true,"message":"Locker 5 command sent."}
//! -> {"op":"check-status","lockerId":5}
//! <- {"code":200,"success":true,"status":"UNLOCKED","channel":5}
//! ```

use std::fmt;

use locker_core::{Bay, BayStatus, LockState};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CODE_OK: u16 = 200;
pub const CODE_BAD_REQUEST: u16 = 400;
pub const CODE_INTERNAL_ERROR: u16 = 500;

/// Severity of a client log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse a level name. Unrecognized names fall back to `Info`.
    pub fn parse(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" | "warning" => LogLevel::Warn,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    OpenLocker { bay: Bay },
    CheckStatus { bay: Bay },
    CheckAllStatuses,
    Log { message: String, level: LogLevel },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
enum WireRequest {
    OpenLocker {
        #[serde(rename = "lockerId", alias = "bayId", default)]
        locker_id: Option<Value>,
    },
    CheckStatus {
        #[serde(rename = "lockerId", alias = "bayId", default)]
        locker_id: Option<Value>,
    },
    CheckAllStatuses,
    Log {
        message: String,
        #[serde(default)]
        level: Option<String>,
    },
}

impl Request {
    /// Parse and validate one request line.
    ///
    /// # Errors
    ///
    /// Returns a `400` response describing what is wrong with the line.
    pub fn parse(line: &str) -> Result<Self, Response> {
        let wire: WireRequest = serde_json::from_str(line)
            .map_err(|e| Response::bad_request(format!("Malformed request: {e}")))?;

        match wire {
            WireRequest::OpenLocker { locker_id } => Ok(Request::OpenLocker {
                bay: parse_locker_id(locker_id)?,
            }),
            WireRequest::CheckStatus { locker_id } => Ok(Request::CheckStatus {
                bay: parse_locker_id(locker_id)?,
            }),
            WireRequest::CheckAllStatuses => Ok(Request::CheckAllStatuses),
            WireRequest::Log { message, level } => Ok(Request::Log {
                message,
                level: level.as_deref().map(LogLevel::parse).unwrap_or_default(),
            }),
        }
    }

    /// Operation name as it appears on the wire.
    pub fn op(&self) -> &'static str {
        match self {
            Request::OpenLocker { .. } => "open-locker",
            Request::CheckStatus { .. } => "check-status",
            Request::CheckAllStatuses => "check-all-statuses",
            Request::Log { .. } => "log",
        }
    }
}

// Numbers and numeric strings are both accepted
fn parse_locker_id(value: Option<Value>) -> Result<Bay, Response> {
    let id = match value {
        None | Some(Value::Null) => return Err(Response::bad_request("Missing lockerId")),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    let id = id.ok_or_else(|| Response::bad_request("Invalid lockerId. Must be a number."))?;
    Bay::try_from(id).map_err(|_| Response::bad_request("Invalid lockerId. Must be 1-8."))
}

/// Reply to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub code: u16,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LockState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Bay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bays: Option<Vec<BayStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn empty(code: u16, success: bool) -> Self {
        Self {
            code,
            success,
            message: None,
            status: None,
            channel: None,
            bays: None,
            error: None,
        }
    }

    pub fn ok() -> Self {
        Self::empty(CODE_OK, true)
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn status(bay: Bay, state: LockState) -> Self {
        Self {
            status: Some(state),
            channel: Some(bay),
            ..Self::ok()
        }
    }

    pub fn bays(statuses: Vec<BayStatus>) -> Self {
        Self {
            bays: Some(statuses),
            ..Self::ok()
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::failure(CODE_BAD_REQUEST, error)
    }

    pub fn internal_error(error: impl Into<String>) -> Self {
        Self::failure(CODE_INTERNAL_ERROR, error)
    }

    fn failure(code: u16, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(code, false)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK && self.success
    }
}
