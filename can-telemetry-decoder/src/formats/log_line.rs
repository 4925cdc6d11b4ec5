//! Log-line parsers
//!
//! Two textual on-disk formats are supported, one frame per line:
//!
//! - `Textual1`: `2021-01-01T00:00:00.003Z 514 8 [54,0,10,0,0,0,0,0]`
//! - `Textual2`: `1659901910.121 514 8 54 0 10 0 0 0 0 0`
//!
//! Identifiers, lengths and bytes are decimal. Timestamps are UTC. The format
//! of a file is always chosen by the caller, never guessed from its content.
//! The wireless live link sends `Textual2` bodies, so its grammar lives here too.

use crate::types::{CanFrame, DecoderError, Result, Timestamp, MAX_PAYLOAD_LEN};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const NANOS_PER_SECOND: u32 = 1_000_000_000;
const FRACTION_DIGITS: usize = 9;

/// On-disk log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// ISO-8601 timestamp and a bracketed, comma separated byte list
    Textual1,
    /// Epoch seconds and space separated bytes
    #[default]
    Textual2,
}

impl FromStr for LogFormat {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "textual1" => Ok(LogFormat::Textual1),
            "textual2" => Ok(LogFormat::Textual2),
            other => Err(DecoderError::Configuration(format!(
                "unknown log format '{}' (expected textual1 or textual2)",
                other
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Textual1 => f.write_str("textual1"),
            LogFormat::Textual2 => f.write_str("textual2"),
        }
    }
}

/// Parse one log line in the given format
pub fn parse_log_line(line: &str, format: LogFormat) -> Result<CanFrame> {
    match format {
        LogFormat::Textual1 => parse_textual1(line),
        LogFormat::Textual2 => parse_free_text(line),
    }
}

/// `timestamp id length data1 data2 ...` with epoch-second timestamps
///
/// Also the body grammar of the wireless live link.
///
/// # Errors
/// - `IncompleteFrame` with fewer than 3 fields or fewer bytes than declared
/// - `MalformedFrame` with more bytes than declared, a non-numeric field, a
///   declared length above 8 or a byte above 255
pub fn parse_free_text(line: &str) -> Result<CanFrame> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(DecoderError::IncompleteFrame(format!(
            "expected at least 3 fields, got {}",
            fields.len()
        )));
    }

    let timestamp = parse_epoch_seconds(fields[0])?;
    let (can_id, length) = parse_header(fields[1], fields[2])?;
    let data = parse_bytes(&fields[3..], length)?;

    CanFrame::new(timestamp, can_id, data)
}

fn parse_textual1(line: &str) -> Result<CanFrame> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(DecoderError::IncompleteFrame(format!(
            "expected 4 fields, got {}",
            fields.len()
        )));
    }

    let timestamp = parse_iso_timestamp(fields[0])?;
    let (can_id, length) = parse_header(fields[1], fields[2])?;

    let list = fields[3..].concat();
    let inner = list
        .strip_prefix('[')
        .ok_or_else(|| DecoderError::MalformedFrame(format!("byte list '{}' lacks '['", list)))?;
    let inner = inner.strip_suffix(']').ok_or_else(|| {
        DecoderError::IncompleteFrame(format!("byte list '{}' is not closed", list))
    })?;

    let items: Vec<&str> = if inner.is_empty() {
        Vec::new()
    } else {
        inner.split(',').collect()
    };
    let data = parse_bytes(&items, length)?;

    CanFrame::new(timestamp, can_id, data)
}

/// Parse an unsigned decimal field; signs and other prefixes are rejected
fn parse_decimal<T: FromStr>(text: &str) -> Option<T> {
    if text.is_empty() || !text.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_header(id: &str, length: &str) -> Result<(u32, usize)> {
    let can_id = parse_decimal::<u32>(id)
        .ok_or_else(|| DecoderError::MalformedFrame(format!("invalid identifier '{}'", id)))?;
    let length = parse_decimal::<usize>(length)
        .ok_or_else(|| DecoderError::MalformedFrame(format!("invalid length '{}'", length)))?;
    if length > MAX_PAYLOAD_LEN {
        return Err(DecoderError::MalformedFrame(format!(
            "declared length {} exceeds {}",
            length, MAX_PAYLOAD_LEN
        )));
    }
    Ok((can_id, length))
}

fn parse_bytes(items: &[&str], length: usize) -> Result<Vec<u8>> {
    if items.len() < length {
        return Err(DecoderError::IncompleteFrame(format!(
            "declared {} data bytes, got {}",
            length,
            items.len()
        )));
    }
    if items.len() > length {
        return Err(DecoderError::MalformedFrame(format!(
            "declared {} data bytes, got {}",
            length,
            items.len()
        )));
    }

    items
        .iter()
        .map(|item| {
            parse_decimal::<u8>(item.trim()).ok_or_else(|| {
                DecoderError::MalformedFrame(format!("invalid data byte '{}'", item))
            })
        })
        .collect()
}

/// Parse `seconds[.fraction]` exactly, without going through a float
fn parse_epoch_seconds(text: &str) -> Result<Timestamp> {
    let malformed = || DecoderError::MalformedFrame(format!("invalid timestamp '{}'", text));

    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };
    let negative = whole.starts_with('-');
    let digits = whole.trim_start_matches('-');
    if digits.is_empty() && fraction.is_empty() {
        return Err(malformed());
    }
    if !digits.bytes().all(|c| c.is_ascii_digit()) || !fraction.bytes().all(|c| c.is_ascii_digit())
    {
        return Err(malformed());
    }

    let mut seconds: i64 = if digits.is_empty() {
        0
    } else {
        digits.parse().map_err(|_| malformed())?
    };

    let kept = &fraction[..fraction.len().min(FRACTION_DIGITS)];
    let mut nanos: u32 = if kept.is_empty() {
        0
    } else {
        let value: u32 = kept.parse().map_err(|_| malformed())?;
        value * 10u32.pow((FRACTION_DIGITS - kept.len()) as u32)
    };

    if negative {
        seconds = -seconds;
        if nanos > 0 {
            seconds -= 1;
            nanos = NANOS_PER_SECOND - nanos;
        }
    }

    DateTime::from_timestamp(seconds, nanos).ok_or_else(malformed)
}

fn parse_iso_timestamp(text: &str) -> Result<Timestamp> {
    let naive = NaiveDateTime::parse_from_str(text, ISO_FORMAT)
        .map_err(|e| DecoderError::MalformedFrame(format!("invalid timestamp '{}': {}", text, e)))?;
    Ok(Utc.from_utc_datetime(&naive))
}
