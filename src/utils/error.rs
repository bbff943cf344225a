use thiserror::Error;

/// Failures raised by the transport client (the Modbus connection itself).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModbusError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Device exception: {0}")]
    Exception(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Transport not connected")]
    NotConnected,
}

impl ModbusError {
    /// True when the connection has to be re-established before the next request.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, ModbusError::ConnectionError(_) | ModbusError::NotConnected)
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionRefused
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotFound
            | ErrorKind::PermissionDenied => ModbusError::ConnectionError(format!("IO error: {}", err)),
            ErrorKind::TimedOut => ModbusError::Timeout,
            _ => ModbusError::CommunicationError(format!("IO error: {}", err)),
        }
    }
}

impl From<tokio::time::error::Elapsed> for ModbusError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ModbusError::Timeout
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("{encoding} needs {expected} registers, got {actual}")]
    InsufficientWords {
        encoding: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field}: invalid hex address '{value}'")]
    InvalidAddress { field: String, value: String },

    #[error("{field}: missing required value")]
    MissingField { field: String },

    #[error("{field}: divisor must be a finite non-zero number, got {value}")]
    InvalidDivisor { field: String, value: f64 },

    #[error("{field}: minimum {minimum} is greater than maximum {maximum}")]
    InvalidRange {
        field: String,
        minimum: f64,
        maximum: f64,
    },

    #[error("{field}: duplicate point address '{address}'")]
    DuplicateAddress { field: String, address: String },

    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Failed to read configuration: {0}")]
    Io(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(format!("TOML error: {}", err))
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Parse(format!("TOML error: {}", err))
    }
}

/// Failure of a single point poll. Never escapes the sweep.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollError {
    #[error(transparent)]
    Transport(#[from] ModbusError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl PollError {
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, PollError::Transport(e) if e.is_connection_lost())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriteError {
    #[error("Point {0} is read-only")]
    ReadOnly(String),

    #[error("Point {address} cannot accept {value}: {reason}")]
    InvalidValue {
        address: String,
        value: String,
        reason: String,
    },

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Point not found: {0}")]
    PointNotFound(String),

    #[error("Write rejected: {0}")]
    Transport(#[from] ModbusError),
}
