//! Hex-text frame grammar
//!
//! Frames from the USB CAN adapter arrive as `iiiLdd..tttt`:
//! - `iii`: 3 hex characters, the 11-bit identifier
//! - `L`: 1 hex character, the payload length (at most 8)
//! - `dd`: `L` bytes, 2 hex characters each
//! - `tttt`: decimal milliseconds since the Unix epoch, running to the end of the text
//!
//! Example: `3CF1014521` is identifier 0x3CF, one byte 0x01, timestamp 4521 ms.
//! The start and end tokens are stripped by the framer before this runs.

use crate::types::{CanFrame, DecoderError, Result, Timestamp, MAX_PAYLOAD_LEN};
use chrono::DateTime;

const ID_CHARS: usize = 3;
const HEADER_CHARS: usize = ID_CHARS + 1;

/// Parse one hex-text frame body
///
/// # Errors
/// - `IncompleteFrame` if the text ends before the header, the data bytes or
///   the timestamp are complete
/// - `MalformedFrame` for a non-hex or non-decimal character, or a length above 8
pub fn parse_hex_frame(text: &str) -> Result<CanFrame> {
    let text = text.trim_end_matches(['\r', '\n']);
    let bytes = text.as_bytes();

    if bytes.len() < HEADER_CHARS {
        return Err(DecoderError::IncompleteFrame(format!(
            "expected at least {} header characters, got {}",
            HEADER_CHARS,
            bytes.len()
        )));
    }

    let can_id = hex_value(&bytes[..ID_CHARS])? as u32;
    let length = hex_value(&bytes[ID_CHARS..HEADER_CHARS])? as usize;
    if length > MAX_PAYLOAD_LEN {
        return Err(DecoderError::MalformedFrame(format!(
            "declared length {} exceeds {}",
            length, MAX_PAYLOAD_LEN
        )));
    }

    let data_end = HEADER_CHARS + 2 * length;
    if bytes.len() < data_end {
        return Err(DecoderError::IncompleteFrame(format!(
            "expected {} data characters, got {}",
            2 * length,
            bytes.len() - HEADER_CHARS
        )));
    }

    let data = bytes[HEADER_CHARS..data_end]
        .chunks(2)
        .map(|pair| hex_value(pair).map(|b| b as u8))
        .collect::<Result<Vec<u8>>>()?;

    let timestamp = millis_timestamp(&bytes[data_end..])?;

    log::trace!(
        "hex frame: id=0x{:X} len={} ts={}",
        can_id,
        length,
        timestamp
    );
    CanFrame::new(timestamp, can_id, data)
}

fn hex_value(digits: &[u8]) -> Result<u64> {
    digits.iter().try_fold(0u64, |acc, &c| {
        let digit = (c as char).to_digit(16).ok_or_else(|| {
            DecoderError::MalformedFrame(format!("invalid hex character {:?}", c as char))
        })?;
        Ok((acc << 4) | u64::from(digit))
    })
}

fn millis_timestamp(digits: &[u8]) -> Result<Timestamp> {
    if digits.is_empty() {
        return Err(DecoderError::IncompleteFrame(
            "missing timestamp".to_string(),
        ));
    }

    let millis = digits.iter().try_fold(0i64, |acc, &c| {
        let digit = (c as char).to_digit(10).ok_or_else(|| {
            DecoderError::MalformedFrame(format!(
                "invalid timestamp character {:?}",
                c as char
            ))
        })?;
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(i64::from(digit)))
            .ok_or_else(|| DecoderError::MalformedFrame("timestamp overflows".to_string()))
    })?;

    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| DecoderError::MalformedFrame(format!("timestamp {} out of range", millis)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn test_single_byte_frame() {
        let frame = parse_hex_frame("3CF1014521").unwrap();
        assert_eq!(frame.can_id(), 0x3CF);
        assert_eq!(frame.data(), &[0x01]);
        assert_eq!(frame.timestamp(), DateTime::from_timestamp_millis(4521).unwrap());
    }

    #[test]
    fn test_full_payload_boundaries() {
        // Each data byte must come from its own pair of characters
        let frame = parse_hex_frame("0A281122334455667788100").unwrap();
        assert_eq!(frame.can_id(), 0x0A2);
        assert_eq!(
            frame.data(),
            &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]
        );
        assert_eq!(frame.timestamp(), DateTime::from_timestamp_millis(100).unwrap());
    }

    #[test]
    fn test_zero_length_frame() {
        let frame = parse_hex_frame("10507").unwrap();
        assert_eq!(frame.can_id(), 0x105);
        assert!(frame.data().is_empty());
        assert_eq!(frame.timestamp(), DateTime::from_timestamp_millis(7).unwrap());
    }

    #[test]
    fn test_lowercase_hex_accepted() {
        let frame = parse_hex_frame("0a02ff8042").unwrap();
        assert_eq!(frame.can_id(), 0x0A0);
        assert_eq!(frame.data(), &[0xFF, 0x80]);
    }

    #[test]
    fn test_truncated_input_is_incomplete() {
        for text in ["", "3C", "3CF", "3CF2", "3CF201", "3CF20102"] {
            let err = parse_hex_frame(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::IncompleteFrame, "{:?}", text);
        }
    }

    #[test]
    fn test_bad_characters_are_malformed() {
        for text in ["3GF1014521", "3CF10Z4521", "3CF10145x1", "3CF9"] {
            let err = parse_hex_frame(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedFrame, "{:?}", text);
        }
    }
}
