//! Decoder configuration types
//!
//! This module defines the configuration needed by the decoder library.
//! Output formatting and file selection belong to the application layer.

use crate::formats::LogFormat;
use serde::{Deserialize, Serialize};

/// Configuration for the decoder library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Format of the log lines to parse (default: textual2)
    #[serde(default)]
    pub log_format: LogFormat,

    /// Errors tolerated per file before the job is aborted (default: 500)
    #[serde(default = "default_max_errors")]
    pub max_errors: usize,

    /// Optional: only decode these specific CAN message IDs
    #[serde(default)]
    pub message_filter: Option<Vec<u32>>,

    /// Bound on the live framer buffer in bytes (default: 128)
    #[serde(default = "default_max_live_frame_len")]
    pub max_live_frame_len: usize,
}

fn default_max_errors() -> usize {
    500
}

fn default_max_live_frame_len() -> usize {
    crate::formats::live::DEFAULT_MAX_FRAME_LEN
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            max_errors: default_max_errors(),
            message_filter: None,
            max_live_frame_len: default_max_live_frame_len(),
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the log line format
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Builder method: set the per-file error limit
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// Builder method: set message filter
    pub fn with_message_filter(mut self, messages: Vec<u32>) -> Self {
        self.message_filter = Some(messages);
        self
    }

    /// Builder method: bound the live framer buffer
    pub fn with_max_live_frame_len(mut self, len: usize) -> Self {
        self.max_live_frame_len = len;
        self
    }

    /// Check if a message ID should be processed
    pub fn should_process_message(&self, can_id: u32) -> bool {
        match &self.message_filter {
            Some(messages) => messages.contains(&can_id),
            None => true,
        }
    }
}
