//! Batch log processor
//!
//! One `LogProcessor` runs per file job. It parses and decodes line by line,
//! skips and counts bad lines, and aborts the job once the error count passes
//! the configured limit. Data points either collect into a `DecodedLog` or
//! stream into a caller-supplied sink as each frame decodes.

use crate::config::DecoderConfig;
use crate::decoder::Decoder;
use crate::formats::parse_log_line;
use crate::types::{DecodedSignal, DecoderError, ErrorKind, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::BufRead;

/// Per-file counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    /// Lines seen, blank ones included
    pub lines_read: usize,
    pub blank_lines: usize,
    pub frames_decoded: usize,
    pub signals_emitted: usize,
    /// Frames dropped by the message filter
    pub filtered: usize,
    /// Recoverable errors by kind
    pub error_counts: HashMap<ErrorKind, usize>,
    /// Distinct identifiers missing from the registry
    pub unknown_ids: usize,
}

impl ProcessingStats {
    /// Total recoverable errors
    pub fn errors(&self) -> usize {
        self.error_counts.values().sum()
    }

    pub fn errors_of(&self, kind: ErrorKind) -> usize {
        self.error_counts.get(&kind).copied().unwrap_or(0)
    }
}

/// Result of one file job
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecodedLog {
    pub records: Vec<DecodedSignal>,
    pub stats: ProcessingStats,
}

/// Line-by-line decoder for one log file
pub struct LogProcessor<'a> {
    decoder: &'a Decoder,
    config: &'a DecoderConfig,
    records: Vec<DecodedSignal>,
    stats: ProcessingStats,
    /// Unknown identifiers already reported, to avoid log spam
    reported_ids: HashSet<u32>,
}

impl<'a> LogProcessor<'a> {
    pub fn new(decoder: &'a Decoder, config: &'a DecoderConfig) -> Self {
        Self {
            decoder,
            config,
            records: Vec::new(),
            stats: ProcessingStats::default(),
            reported_ids: HashSet::new(),
        }
    }

    /// Parse and decode one line, collecting its data points
    ///
    /// Recoverable errors are counted and swallowed. Returns `TooManyErrors`
    /// once the count exceeds `max_errors`.
    pub fn process_line(&mut self, line_number: usize, line: &str) -> Result<()> {
        let points = self.decode_line(line_number, line)?;
        self.records.extend(points);
        Ok(())
    }

    /// Parse and decode one line, handing each data point to `sink`
    ///
    /// An error returned by the sink stops processing and is passed through.
    pub fn process_line_with<F>(
        &mut self,
        line_number: usize,
        line: &str,
        sink: &mut F,
    ) -> Result<()>
    where
        F: FnMut(DecodedSignal) -> Result<()>,
    {
        for point in self.decode_line(line_number, line)? {
            sink(point)?;
        }
        Ok(())
    }

    /// Process every line of a reader, collecting data points
    ///
    /// Lines that are not valid UTF-8 count as malformed.
    pub fn process_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        let mut records = std::mem::take(&mut self.records);
        let result = self.process_reader_with(reader, |point| {
            records.push(point);
            Ok(())
        });
        self.records = records;
        result
    }

    /// Process every line of a reader without keeping its data points
    ///
    /// Each point goes to `sink` as soon as its frame decodes, so memory use
    /// does not grow with the file.
    pub fn process_reader_with<R, F>(&mut self, reader: R, mut sink: F) -> Result<()>
    where
        R: BufRead,
        F: FnMut(DecodedSignal) -> Result<()>,
    {
        for (index, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            let line_number = index + 1;
            match std::str::from_utf8(&line) {
                Ok(text) => self.process_line_with(line_number, text, &mut sink)?,
                Err(_) => {
                    self.stats.lines_read += 1;
                    self.record_error(
                        line_number,
                        DecoderError::MalformedFrame("line is not valid UTF-8".to_string()),
                    )?;
                }
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Consume the processor and return the collected data points
    ///
    /// `records` is empty when the points were streamed to a sink.
    pub fn finish(self) -> DecodedLog {
        DecodedLog {
            records: self.records,
            stats: self.stats,
        }
    }

    fn decode_line(&mut self, line_number: usize, line: &str) -> Result<Vec<DecodedSignal>> {
        self.stats.lines_read += 1;

        let line = line.trim();
        if line.is_empty() {
            self.stats.blank_lines += 1;
            return Ok(Vec::new());
        }

        let frame = match parse_log_line(line, self.config.log_format) {
            Ok(frame) => frame,
            Err(e) => return self.record_error(line_number, e).map(|_| Vec::new()),
        };

        if !self.config.should_process_message(frame.can_id()) {
            self.stats.filtered += 1;
            return Ok(Vec::new());
        }

        match self.decoder.decode_frame(&frame) {
            Ok(points) => {
                self.stats.frames_decoded += 1;
                self.stats.signals_emitted += points.len();
                Ok(points)
            }
            Err(e) => self.record_error(line_number, e).map(|_| Vec::new()),
        }
    }

    fn record_error(&mut self, line_number: usize, error: DecoderError) -> Result<()> {
        if !error.is_recoverable() {
            return Err(error);
        }

        *self.stats.error_counts.entry(error.kind()).or_insert(0) += 1;

        match error {
            DecoderError::UnknownIdentifier(can_id) => {
                if self.reported_ids.insert(can_id) {
                    self.stats.unknown_ids += 1;
                    log::warn!(
                        "Line {}: unknown CAN ID 0x{:X}, further frames skipped silently",
                        line_number,
                        can_id
                    );
                }
            }
            other => log::warn!("Line {}: {}", line_number, other),
        }

        let errors = self.stats.errors();
        if errors > self.config.max_errors {
            log::error!(
                "Aborting after {} errors (limit {})",
                errors,
                self.config.max_errors
            );
            return Err(DecoderError::TooManyErrors {
                errors,
                limit: self.config.max_errors,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const GOOD: &str = "1659901910.121 514 4 54 0 10 0";

    #[test]
    fn test_good_and_blank_lines() {
        let decoder = Decoder::new();
        let config = DecoderConfig::new();
        let mut processor = LogProcessor::new(&decoder, &config);

        processor.process_line(1, GOOD).unwrap();
        processor.process_line(2, "   ").unwrap();
        processor.process_line(3, "").unwrap();

        let log = processor.finish();
        assert_eq!(log.stats.lines_read, 3);
        assert_eq!(log.stats.blank_lines, 2);
        assert_eq!(log.stats.frames_decoded, 1);
        assert_eq!(log.stats.errors(), 0);
        assert_eq!(log.records.len(), 2);
    }

    #[test]
    fn test_errors_are_counted_per_kind() {
        let decoder = Decoder::new();
        let config = DecoderConfig::new();
        let mut processor = LogProcessor::new(&decoder, &config);

        let input = [
            GOOD,
            "1659901910.121 514 8 54 0 10",   // incomplete
            "1659901910.121 514 1 54 0",      // malformed
            "1659901910.121 2046 1 1",        // unknown
            "1659901910.122 2046 1 1",        // unknown, same id
            "1659901910.121 514 2 54 0",      // decode: 514 needs 4 bytes
        ]
        .join("\n");
        processor.process_reader(Cursor::new(input)).unwrap();

        let stats = processor.stats();
        assert_eq!(stats.errors_of(ErrorKind::IncompleteFrame), 1);
        assert_eq!(stats.errors_of(ErrorKind::MalformedFrame), 1);
        assert_eq!(stats.errors_of(ErrorKind::UnknownIdentifier), 2);
        assert_eq!(stats.errors_of(ErrorKind::Decode), 1);
        assert_eq!(stats.unknown_ids, 1);
        assert_eq!(stats.errors(), 5);
        assert_eq!(stats.frames_decoded, 1);
    }

    #[test]
    fn test_error_limit_aborts_job() {
        let decoder = Decoder::new();
        let config = DecoderConfig::new().with_max_errors(2);
        let mut processor = LogProcessor::new(&decoder, &config);

        let input = "garbage\ngarbage\n".to_string() + GOOD + "\ngarbage\n" + GOOD;
        let err = processor.process_reader(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, DecoderError::TooManyErrors { errors: 3, limit: 2 }));
        // Processing stopped at the third bad line
        assert_eq!(processor.stats().lines_read, 4);
    }

    #[test]
    fn test_message_filter() {
        let decoder = Decoder::new();
        let config = DecoderConfig::new().with_message_filter(vec![3]);
        let mut processor = LogProcessor::new(&decoder, &config);

        processor.process_line(1, GOOD).unwrap();
        processor.process_line(2, "1659901910.121 3 1 1").unwrap();

        let log = processor.finish();
        assert_eq!(log.stats.filtered, 1);
        assert_eq!(log.stats.frames_decoded, 1);
        assert_eq!(log.records.len(), 1);
    }

    #[test]
    fn test_invalid_utf8_line_is_malformed() {
        let decoder = Decoder::new();
        let config = DecoderConfig::new();
        let mut processor = LogProcessor::new(&decoder, &config);

        let mut input = GOOD.as_bytes().to_vec();
        input.extend_from_slice(b"\n\xFF\xFE\n");
        processor.process_reader(Cursor::new(input)).unwrap();
        assert_eq!(processor.stats().errors_of(ErrorKind::MalformedFrame), 1);
        assert_eq!(processor.stats().frames_decoded, 1);
    }

    #[test]
    fn test_streaming_keeps_nothing_in_memory() {
        let decoder = Decoder::new();
        let config = DecoderConfig::new();
        let mut processor = LogProcessor::new(&decoder, &config);

        let input = vec![GOOD; 1000].join("\n") + "\ngarbage\n";
        let mut seen = 0;
        let mut last_signal = 0;
        processor
            .process_reader_with(Cursor::new(input), |point| {
                seen += 1;
                last_signal = point.signal_id;
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, 2000);
        assert_eq!(last_signal, 90);
        let log = processor.finish();
        assert!(log.records.is_empty());
        assert_eq!(log.stats.signals_emitted, 2000);
        assert_eq!(log.stats.errors(), 1);
    }

    #[test]
    fn test_sink_error_stops_processing() {
        let decoder = Decoder::new();
        let config = DecoderConfig::new();
        let mut processor = LogProcessor::new(&decoder, &config);

        let input = [GOOD, GOOD, GOOD].join("\n");
        let err = processor
            .process_reader_with(Cursor::new(input), |_| {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed").into())
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(processor.stats().lines_read, 1);
    }
}
