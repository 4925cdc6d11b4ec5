//! Core types for the CAN telemetry decoder library
//!
//! This module defines the frame, value and error types shared by every stage of
//! the pipeline. Frames come out of the parsers, decoded signals come out of the
//! dispatcher, and every failure is one of the `DecoderError` kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the decoder
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Stable key of one physical measurement in the signal catalog
pub type SignalId = u16;

/// Largest payload a classic CAN frame can carry
pub const MAX_PAYLOAD_LEN: usize = 8;

/// Raw CAN frame as extracted from a live stream or a log line
///
/// This represents a single CAN frame before any message interpretation.
/// Frames are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    timestamp: Timestamp,
    can_id: u32,
    data: Vec<u8>,
}

impl CanFrame {
    /// Create a frame, rejecting payloads longer than 8 bytes
    pub fn new(timestamp: Timestamp, can_id: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() > MAX_PAYLOAD_LEN {
            return Err(DecoderError::MalformedFrame(format!(
                "payload of {} bytes exceeds {} bytes",
                data.len(),
                MAX_PAYLOAD_LEN
            )));
        }
        Ok(Self {
            timestamp,
            can_id,
            data,
        })
    }

    /// Reception time of the frame
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// CAN message ID (11-bit or 29-bit)
    pub fn can_id(&self) -> u32 {
        self.can_id
    }

    /// Frame data bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the data length code (DLC) - number of data bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// Errors that can occur during parsing and decoding
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Incomplete frame: {0}")]
    IncompleteFrame(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Unknown CAN ID: 0x{0:X}")]
    UnknownIdentifier(u32),

    #[error("Failed to decode CAN ID 0x{can_id:X}: {reason}")]
    Decode { can_id: u32, reason: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Too many errors: {errors} exceeds the limit of {limit}")]
    TooManyErrors { errors: usize, limit: usize },

    #[error("Signal not found: {0}")]
    SignalNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Fieldless view of a `DecoderError`, used for counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    IncompleteFrame,
    MalformedFrame,
    UnknownIdentifier,
    Decode,
    Configuration,
    TooManyErrors,
    SignalNotFound,
    Io,
}

impl DecoderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecoderError::IncompleteFrame(_) => ErrorKind::IncompleteFrame,
            DecoderError::MalformedFrame(_) => ErrorKind::MalformedFrame,
            DecoderError::UnknownIdentifier(_) => ErrorKind::UnknownIdentifier,
            DecoderError::Decode { .. } => ErrorKind::Decode,
            DecoderError::Configuration(_) => ErrorKind::Configuration,
            DecoderError::TooManyErrors { .. } => ErrorKind::TooManyErrors,
            DecoderError::SignalNotFound(_) => ErrorKind::SignalNotFound,
            DecoderError::IoError(_) => ErrorKind::Io,
        }
    }

    /// True for errors caused by bad input data; the stream can continue past them
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::IncompleteFrame
                | ErrorKind::MalformedFrame
                | ErrorKind::UnknownIdentifier
                | ErrorKind::Decode
        )
    }

    pub(crate) fn decode(can_id: u32, reason: impl Into<String>) -> Self {
        DecoderError::Decode {
            can_id,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::IncompleteFrame => "incomplete",
            ErrorKind::MalformedFrame => "malformed",
            ErrorKind::UnknownIdentifier => "unknown identifier",
            ErrorKind::Decode => "decode",
            ErrorKind::Configuration => "configuration",
            ErrorKind::TooManyErrors => "too many errors",
            ErrorKind::SignalNotFound => "signal not found",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// Signal value types produced by the message layouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Unscaled integer value
    Integer(i64),
    /// Floating-point value (after unit scaling)
    Float(f64),
    /// Short status text (flag registers, per-cell reports)
    Status(String),
}

/// The variant a signal always decodes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Float,
    Status,
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Integer(v) => write!(f, "{}", v),
            SignalValue::Float(v) => write!(f, "{:.3}", v),
            SignalValue::Status(s) => f.write_str(s),
        }
    }
}

impl SignalValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            SignalValue::Integer(_) => ValueKind::Integer,
            SignalValue::Float(_) => ValueKind::Float,
            SignalValue::Status(_) => ValueKind::Status,
        }
    }

    /// Convert signal value to f64 for charting; status text has no numeric value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalValue::Integer(v) => Some(*v as f64),
            SignalValue::Float(v) => Some(*v),
            SignalValue::Status(_) => None,
        }
    }

    /// Convert signal value to i64 if it holds an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SignalValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Raw flag bits of an integer or a binary flag register string
    pub fn as_flags(&self) -> Option<u64> {
        match self {
            SignalValue::Integer(v) => Some(*v as u64),
            SignalValue::Status(s) if !s.is_empty() && s.len() <= 64 => {
                u64::from_str_radix(s, 2).ok()
            }
            _ => None,
        }
    }
}

/// One decoded, scaled measurement (a data point)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedSignal {
    /// Timestamp copied from the owning frame
    pub timestamp: Timestamp,
    /// Key into the signal catalog
    pub signal_id: SignalId,
    /// Decoded value
    pub value: SignalValue,
}
