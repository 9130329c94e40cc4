use std::fmt;
use std::io;
use thiserror::Error;

/// Cause tag attached to transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The operation did not finish before its deadline
    Timeout,
    /// The peer closed the stream
    Eof,
    /// Any other I/O failure
    Other,
}

impl FailureKind {
    /// Classify an I/O error
    pub fn classify(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FailureKind::Timeout,
            io::ErrorKind::UnexpectedEof => FailureKind::Eof,
            _ => FailureKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Eof => "eof",
            FailureKind::Other => "error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for SolarMan V5 operations
#[derive(Error, Debug)]
pub enum SolarmanError {
    #[error("Connect to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Transport {stage}_{kind}: {source}")]
    Transport {
        stage: &'static str,
        kind: FailureKind,
        #[source]
        source: io::Error,
    },

    #[error("Frame format error: {0}")]
    FrameFormat(String),

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("CRC mismatch: expected 0x{expected:04X}, got 0x{actual:04X}")]
    CrcMismatch { expected: u16, actual: u16 },

    #[error("Trailing data: {0} bytes left")]
    TrailingData(usize),

    #[error("Truncated {field}: need {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Protocol mismatch: expected control code 0x{expected:04X}, got 0x{actual:04X}")]
    ProtocolMismatch { expected: u16, actual: u16 },

    #[error("Modbus response not found in payload")]
    ModbusResponseNotFound,

    #[error("Unexpected response: device address 0x{address:02X}, function code 0x{function:02X}")]
    UnexpectedFunction { address: u8, function: u8 },

    #[error("Unexpected quantity: expected {expected}, got {actual}")]
    QuantityMismatch { expected: usize, actual: usize },

    #[error("Modbus exception: function 0x{function:02X}, code 0x{code:02X}")]
    ModbusException { function: u8, code: u8 },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("{point} [{logger}] {message}: {source}")]
    Context {
        point: &'static str,
        logger: u32,
        message: &'static str,
        #[source]
        source: Box<SolarmanError>,
    },
}

impl SolarmanError {
    /// Wrap this error with the failing operation and the logger serial number
    pub fn context(self, point: &'static str, logger: u32, message: &'static str) -> Self {
        SolarmanError::Context {
            point,
            logger,
            message,
            source: Box::new(self),
        }
    }

    /// Build a transport error from an I/O failure in `stage` ("write", "read")
    pub fn transport(stage: &'static str, source: io::Error) -> Self {
        SolarmanError::Transport {
            stage,
            kind: FailureKind::classify(&source),
            source,
        }
    }

    /// The innermost error, skipping every `Context` layer
    pub fn root(&self) -> &SolarmanError {
        let mut current = self;
        while let SolarmanError::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// True for failures that leave the connection unusable
    pub fn is_transport(&self) -> bool {
        matches!(
            self.root(),
            SolarmanError::Connect { .. } | SolarmanError::Transport { .. }
        )
    }

    /// Failure tag for transport errors
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.root() {
            SolarmanError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result type alias for SolarMan V5 operations
pub type SolarmanResult<T> = Result<T, SolarmanError>;
