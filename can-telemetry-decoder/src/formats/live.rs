//! Live-stream framer
//!
//! Bytes from a live link arrive in arbitrary chunks. The framer buffers them
//! between a start token and an end token, then hands the buffered body to the
//! protocol's grammar. One framer serves one physical connection.
//!
//! State machine:
//! - `Idle`: bytes are ignored until a start token arrives
//! - `Accumulating`: bytes are buffered; the end token triggers a parse
//!
//! A start token seen while accumulating discards the buffer and starts over
//! (the newest start token wins). An `IncompleteFrame` result at the end token
//! keeps the buffer, since the body may legitimately contain the end token.

use super::hex_text::parse_hex_frame;
use super::log_line::parse_free_text;
use crate::types::{CanFrame, DecoderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest valid free-text body: a nanosecond timestamp, a 32-bit identifier
/// and eight three-digit bytes, single spaced
pub const LONGEST_FREE_TEXT_BODY: usize = 20 + 1 + 10 + 1 + 1 + 8 * 4;

/// Default bound on the accumulation buffer
pub const DEFAULT_MAX_FRAME_LEN: usize = 128;

/// Body grammar of a live protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameGrammar {
    /// `iiiLdd..tttt`
    HexText,
    /// `timestamp id length data1 data2 ...`
    FreeText,
}

/// Framing of one live link
///
/// Deserialized from its name via `TryFrom<String>` (see the manual impl below;
/// the derive would require `'de: 'static` because of the `&'static str` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct LiveProtocol {
    pub name: &'static str,
    pub start_token: u8,
    pub end_token: u8,
    pub grammar: FrameGrammar,
}

impl LiveProtocol {
    /// USB CAN adapter with timestamps enabled
    pub const CANDAPTER: LiveProtocol = LiveProtocol {
        name: "candapter",
        start_token: b'T',
        end_token: b'\r',
        grammar: FrameGrammar::HexText,
    };

    /// Wireless telemetry link
    pub const XBEE: LiveProtocol = LiveProtocol {
        name: "xbee",
        start_token: b's',
        end_token: b'\n',
        grammar: FrameGrammar::FreeText,
    };

    fn parse_body(&self, body: &str) -> Result<CanFrame> {
        match self.grammar {
            FrameGrammar::HexText => parse_hex_frame(body),
            FrameGrammar::FreeText => parse_free_text(body),
        }
    }
}

impl FromStr for LiveProtocol {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "candapter" => Ok(LiveProtocol::CANDAPTER),
            "xbee" => Ok(LiveProtocol::XBEE),
            other => Err(DecoderError::Configuration(format!(
                "unknown live protocol '{}' (expected candapter or xbee)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for LiveProtocol {
    type Error = DecoderError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl<'de> Deserialize<'de> for LiveProtocol {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        LiveProtocol::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl From<LiveProtocol> for String {
    fn from(protocol: LiveProtocol) -> Self {
        protocol.name.to_string()
    }
}

impl fmt::Display for LiveProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Framer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    Idle,
    Accumulating,
}

/// Counters exposed for link reliability monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FramerStats {
    /// Frames parsed successfully
    pub frames: usize,
    /// Buffered bodies rejected by the grammar or by the length bound
    pub failures: usize,
    /// Buffers dropped because a new start token arrived
    pub resync_discards: usize,
    /// Buffers dropped because they grew past the length bound
    pub overflow_discards: usize,
    /// Bytes seen while idle
    pub ignored_bytes: usize,
}

/// Incremental start/end token framer
#[derive(Debug)]
pub struct LiveFramer {
    protocol: LiveProtocol,
    state: FramerState,
    buffer: Vec<u8>,
    max_frame_len: usize,
    stats: FramerStats,
}

impl LiveFramer {
    pub fn new(protocol: LiveProtocol) -> Self {
        Self {
            protocol,
            state: FramerState::Idle,
            buffer: Vec::with_capacity(DEFAULT_MAX_FRAME_LEN),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            stats: FramerStats::default(),
        }
    }

    /// Builder method: bound the accumulation buffer
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len.max(1);
        self
    }

    pub fn protocol(&self) -> LiveProtocol {
        self.protocol
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Drop any partial frame and return to `Idle`; counters are kept
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = FramerState::Idle;
    }

    /// Feed one byte
    ///
    /// Returns `Ok(Some(frame))` when the byte completes a frame, `Ok(None)`
    /// while more bytes are needed, and `Err` when a buffered body was rejected.
    /// Every error is recoverable; the framer is back in `Idle` afterwards.
    pub fn push_byte(&mut self, byte: u8) -> Result<Option<CanFrame>> {
        if byte == self.protocol.start_token {
            if self.state == FramerState::Accumulating && !self.buffer.is_empty() {
                log::trace!(
                    "{}: start token mid-frame, discarding {} buffered bytes",
                    self.protocol,
                    self.buffer.len()
                );
                self.stats.resync_discards += 1;
            }
            self.buffer.clear();
            self.state = FramerState::Accumulating;
            return Ok(None);
        }

        if self.state == FramerState::Idle {
            self.stats.ignored_bytes += 1;
            return Ok(None);
        }

        if byte == self.protocol.end_token {
            return self.finish_frame();
        }

        self.append(byte)?;
        Ok(None)
    }

    /// Feed a chunk, collecting every completed frame and every rejection in order
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<CanFrame>> {
        bytes
            .iter()
            .filter_map(|&b| self.push_byte(b).transpose())
            .collect()
    }

    fn append(&mut self, byte: u8) -> Result<()> {
        if self.buffer.len() >= self.max_frame_len {
            self.stats.overflow_discards += 1;
            self.stats.failures += 1;
            self.reset();
            return Err(DecoderError::MalformedFrame(format!(
                "frame body exceeds {} bytes",
                self.max_frame_len
            )));
        }
        self.buffer.push(byte);
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<Option<CanFrame>> {
        let parsed = std::str::from_utf8(&self.buffer)
            .map_err(|_| DecoderError::MalformedFrame("frame body is not valid text".to_string()))
            .and_then(|body| self.protocol.parse_body(body));

        match parsed {
            Ok(frame) => {
                self.stats.frames += 1;
                self.reset();
                Ok(Some(frame))
            }
            Err(DecoderError::IncompleteFrame(reason)) => {
                log::trace!("{}: end token in incomplete frame ({})", self.protocol, reason);
                if self.protocol.grammar == FrameGrammar::FreeText {
                    // The token separates fields like any other whitespace
                    self.append(b' ')?;
                }
                Ok(None)
            }
            Err(e) => {
                self.stats.failures += 1;
                self.reset();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use chrono::DateTime;

    fn frames(results: Vec<Result<CanFrame>>) -> Vec<CanFrame> {
        results.into_iter().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_candapter_frame() {
        let mut framer = LiveFramer::new(LiveProtocol::CANDAPTER);
        let out = frames(framer.feed(b"T3CF1014521\r"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].can_id(), 0x3CF);
        assert_eq!(out[0].data(), &[0x01]);
        assert_eq!(framer.state(), FramerState::Idle);
        assert_eq!(framer.stats().frames, 1);
    }

    #[test]
    fn test_arbitrary_chunk_boundaries() {
        let stream = b"T3CF1014521\rT1002AABB99\r";
        let mut whole = LiveFramer::new(LiveProtocol::CANDAPTER);
        let expected = frames(whole.feed(stream));
        assert_eq!(expected.len(), 2);

        for split in 0..stream.len() {
            let mut framer = LiveFramer::new(LiveProtocol::CANDAPTER);
            let mut got = frames(framer.feed(&stream[..split]));
            got.extend(frames(framer.feed(&stream[split..])));
            assert_eq!(got, expected, "split at {}", split);
        }
    }

    #[test]
    fn test_bytes_before_start_token_are_ignored() {
        let mut framer = LiveFramer::new(LiveProtocol::CANDAPTER);
        let out = frames(framer.feed(b"21\rT3CF1014521\r"));
        assert_eq!(out.len(), 1);
        assert_eq!(framer.stats().ignored_bytes, 3);
    }

    #[test]
    fn test_start_token_resynchronizes() {
        let mut framer = LiveFramer::new(LiveProtocol::CANDAPTER);
        let out = frames(framer.feed(b"T3CF10T1002AABB99\r"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].can_id(), 0x100);
        assert_eq!(out[0].data(), &[0xAA, 0xBB]);
        assert_eq!(framer.stats().resync_discards, 1);
    }

    #[test]
    fn test_malformed_body_is_reported_and_discarded() {
        let mut framer = LiveFramer::new(LiveProtocol::CANDAPTER);
        let out = framer.feed(b"TZZZ1014521\rT3CF1014521\r");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap_err().kind(), ErrorKind::MalformedFrame);
        assert_eq!(out[1].as_ref().unwrap().can_id(), 0x3CF);
        assert_eq!(framer.stats().failures, 1);
        assert_eq!(framer.stats().frames, 1);
    }

    #[test]
    fn test_overflow_discards_buffer() {
        let mut framer = LiveFramer::new(LiveProtocol::CANDAPTER).with_max_frame_len(8);
        let out = framer.feed(b"T0123456789\rT3CF1014521\r");
        assert_eq!(out[0].as_ref().unwrap_err().kind(), ErrorKind::MalformedFrame);
        assert_eq!(framer.stats().overflow_discards, 1);
        // Bytes after the overflow are ignored until the next start token
        assert!(framer.stats().ignored_bytes > 0);
    }

    #[test]
    fn test_longest_xbee_frame_fits_default_bound() {
        let longest = "1659901910.123456789 4294967295 8 255 255 255 255 255 255 255 255";
        assert_eq!(longest.len(), LONGEST_FREE_TEXT_BODY);
        assert!(LONGEST_FREE_TEXT_BODY < DEFAULT_MAX_FRAME_LEN);

        // Padded with extra separators to exactly the default bound
        let separator = " ".repeat(1 + DEFAULT_MAX_FRAME_LEN - longest.len());
        let padded = longest.replacen(' ', &separator, 1);
        assert_eq!(padded.len(), DEFAULT_MAX_FRAME_LEN);

        let mut framer = LiveFramer::new(LiveProtocol::XBEE);
        let out = frames(framer.feed(format!("s{}\ns{}\n", longest, padded).as_bytes()));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], out[1]);
        assert_eq!(out[0].can_id(), u32::MAX);
        assert_eq!(out[0].data(), &[255; 8]);
        assert_eq!(framer.stats().overflow_discards, 0);

        let over = format!("s {}\n", padded);
        let results = framer.feed(over.as_bytes());
        assert_eq!(results[0].as_ref().unwrap_err().kind(), ErrorKind::MalformedFrame);
        assert_eq!(framer.stats().overflow_discards, 1);
    }

    #[test]
    fn test_xbee_waits_for_missing_bytes() {
        let mut framer = LiveFramer::new(LiveProtocol::XBEE);
        assert!(framer.feed(b"s1659901910.121 514 4 54 0\n").is_empty());
        assert_eq!(framer.state(), FramerState::Accumulating);

        let out = frames(framer.feed(b"10 0\n"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].can_id(), 514);
        assert_eq!(out[0].data(), &[54, 0, 10, 0]);
        assert_eq!(
            out[0].timestamp(),
            DateTime::from_timestamp(1_659_901_910, 121_000_000).unwrap()
        );
    }

    #[test]
    fn test_xbee_too_many_bytes_is_malformed() {
        let mut framer = LiveFramer::new(LiveProtocol::XBEE);
        let out = framer.feed(b"s1659901910.121 514 1 54 0\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap_err().kind(), ErrorKind::MalformedFrame);
        assert_eq!(framer.state(), FramerState::Idle);
    }

    #[test]
    fn test_protocol_names() {
        assert_eq!("candapter".parse::<LiveProtocol>().unwrap(), LiveProtocol::CANDAPTER);
        assert_eq!("XBee".parse::<LiveProtocol>().unwrap(), LiveProtocol::XBEE);
        assert!("serial".parse::<LiveProtocol>().is_err());
        assert_eq!(LiveProtocol::XBEE.to_string(), "xbee");
    }
}
