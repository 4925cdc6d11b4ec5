//! Frame parsers (live streams and log lines)
//!
//! This module contains the parsers that turn text into `CanFrame`s.
//! The log-line parser is stateless; the live framer buffers across calls.

pub mod hex_text;
pub mod live;
pub mod log_line;

// Re-export parser types
pub use hex_text::parse_hex_frame;
pub use live::{FrameGrammar, FramerState, FramerStats, LiveFramer, LiveProtocol};
pub use log_line::{parse_free_text, parse_log_line, LogFormat};
