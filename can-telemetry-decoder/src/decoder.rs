//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! The Decoder struct is the single dispatch point for frames from live links
//! and log files alike, so both paths decode the same bytes identically.

use crate::config::DecoderConfig;
use crate::messages::{MessageRegistry, RegistryStats};
use crate::processor::{DecodedLog, LogProcessor, ProcessingStats};
use crate::types::{CanFrame, DecodedSignal, DecoderError, Result, SignalId, SignalValue};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
pub struct Decoder {
    /// Read-only message registry shared by every decoder instance
    registry: &'static MessageRegistry,
}

impl Decoder {
    /// Create a new decoder instance
    pub fn new() -> Self {
        Self {
            registry: MessageRegistry::global(),
        }
    }

    /// Decode a payload for the given identifier
    ///
    /// # Errors
    /// - `UnknownIdentifier` if the identifier is not registered
    /// - `Decode` if the payload is shorter than the message expects
    pub fn decode_payload(&self, can_id: u32, data: &[u8]) -> Result<Vec<(SignalId, SignalValue)>> {
        let message = self
            .registry
            .get(can_id)
            .ok_or(DecoderError::UnknownIdentifier(can_id))?;

        if let Some(expected) = message.expected_len {
            if data.len() < expected {
                return Err(DecoderError::decode(
                    can_id,
                    format!(
                        "{} expects {} bytes, got {}",
                        message.description,
                        expected,
                        data.len()
                    ),
                ));
            }
        }

        message.layout.decode(can_id, data)
    }

    /// Decode one frame into data points tagged with the frame's timestamp
    ///
    /// Either the full signal set of the frame is returned or an error is;
    /// a heartbeat yields an empty vector.
    ///
    /// # Example
    /// ```
    /// use can_telemetry_decoder::{CanFrame, Decoder};
    /// use chrono::DateTime;
    ///
    /// let decoder = Decoder::new();
    /// let ts = DateTime::from_timestamp(1_659_901_910, 0).unwrap();
    /// let frame = CanFrame::new(ts, 514, vec![54, 0, 10, 0]).unwrap();
    ///
    /// let signals = decoder.decode_frame(&frame).unwrap();
    /// assert_eq!(signals.len(), 2);
    /// ```
    pub fn decode_frame(&self, frame: &CanFrame) -> Result<Vec<DecodedSignal>> {
        let values = self.decode_payload(frame.can_id(), frame.data())?;
        log::debug!(
            "Decoded CAN ID 0x{:X}: {} signals",
            frame.can_id(),
            values.len()
        );

        let timestamp = frame.timestamp();
        Ok(values
            .into_iter()
            .map(|(signal_id, value)| DecodedSignal {
                timestamp,
                signal_id,
                value,
            })
            .collect())
    }

    /// Decode a log file and return its data points and statistics
    ///
    /// # Arguments
    /// * `path` - Path to the log file
    /// * `config` - Decoder configuration (log format, error limit, filter)
    ///
    /// # Errors
    /// `IoError` if the file cannot be read, `TooManyErrors` once the error
    /// count exceeds `config.max_errors`.
    ///
    /// # Example
    /// ```no_run
    /// use can_telemetry_decoder::{Decoder, DecoderConfig};
    /// use std::path::Path;
    ///
    /// let decoder = Decoder::new();
    /// let config = DecoderConfig::new();
    /// let log = decoder.decode_file(Path::new("run-07.log"), &config).unwrap();
    ///
    /// for point in &log.records {
    ///     println!("{} {} {}", point.timestamp, point.signal_id, point.value);
    /// }
    /// ```
    pub fn decode_file(&self, path: &Path, config: &DecoderConfig) -> Result<DecodedLog> {
        let mut records = Vec::new();
        let stats = self.decode_file_with(path, config, |point| {
            records.push(point);
            Ok(())
        })?;
        Ok(DecodedLog { records, stats })
    }

    /// Decode a log file, streaming each data point to `sink`
    ///
    /// Nothing is buffered beyond the current line. An error from `sink`
    /// aborts the job and is returned.
    pub fn decode_file_with<F>(
        &self,
        path: &Path,
        config: &DecoderConfig,
        sink: F,
    ) -> Result<ProcessingStats>
    where
        F: FnMut(DecodedSignal) -> Result<()>,
    {
        log::info!("Decoding log file: {:?} ({})", path, config.log_format);

        let file = File::open(path)?;
        let mut processor = LogProcessor::new(self, config);
        processor.process_reader_with(BufReader::new(file), sink)?;
        let stats = processor.finish().stats;

        log::info!(
            "Finished {:?}: {} lines, {} data points, {} errors",
            path,
            stats.lines_read,
            stats.signals_emitted,
            stats.errors()
        );
        Ok(stats)
    }

    /// Get statistics about the message registry
    pub fn registry_stats(&self) -> RegistryStats {
        self.registry.stats()
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge per-worker results into one timestamp-ordered sequence
///
/// Each input keeps its internal order. Equal timestamps are taken from the
/// earlier input first, so the merge is stable.
pub fn merge_by_timestamp(inputs: Vec<Vec<DecodedSignal>>) -> Vec<DecodedSignal> {
    let total = inputs.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);

    let mut sources: Vec<_> = inputs.into_iter().map(|v| v.into_iter().peekable()).collect();
    let mut heap = BinaryHeap::new();
    for (index, source) in sources.iter_mut().enumerate() {
        if let Some(first) = source.peek() {
            heap.push(Reverse((first.timestamp, index)));
        }
    }

    while let Some(Reverse((_, index))) = heap.pop() {
        let source = &mut sources[index];
        if let Some(point) = source.next() {
            merged.push(point);
        }
        if let Some(next) = source.peek() {
            heap.push(Reverse((next.timestamp, index)));
        }
    }

    merged
}
