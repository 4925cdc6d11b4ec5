//! Live capture replay
//!
//! Reads a byte stream (a capture file or stdin) in chunks, frames it with the
//! selected protocol and writes data points as soon as each frame decodes.

use crate::output::SignalWriter;
use anyhow::{Context, Result};
use can_telemetry_decoder::formats::FramerState;
use can_telemetry_decoder::{
    CanFrame, Decoder, DecoderConfig, DecoderError, FramerStats, LiveFramer, LiveProtocol,
};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

const CHUNK_SIZE: usize = 4096;

/// Counters for one live session
#[derive(Debug, Clone, Default)]
pub struct LiveSummary {
    pub framer: FramerStats,
    pub frames_decoded: usize,
    pub signals_emitted: usize,
    pub filtered: usize,
    pub decode_errors: usize,
    pub unknown_ids: usize,
}

struct LiveSession<'a> {
    decoder: &'a Decoder,
    config: &'a DecoderConfig,
    reported_ids: HashSet<u32>,
    summary: LiveSummary,
}

impl<'a> LiveSession<'a> {
    fn handle_frame<W: Write>(
        &mut self,
        frame: &CanFrame,
        writer: &mut SignalWriter<W>,
    ) -> Result<()> {
        if !self.config.should_process_message(frame.can_id()) {
            self.summary.filtered += 1;
            return Ok(());
        }

        match self.decoder.decode_frame(frame) {
            Ok(points) => {
                self.summary.frames_decoded += 1;
                self.summary.signals_emitted += points.len();
                writer.write_all(&points)?;
            }
            Err(DecoderError::UnknownIdentifier(can_id)) => {
                self.summary.decode_errors += 1;
                if self.reported_ids.insert(can_id) {
                    self.summary.unknown_ids += 1;
                    log::warn!("Unknown CAN ID 0x{:X} on live link", can_id);
                }
            }
            Err(e) if e.is_recoverable() => {
                self.summary.decode_errors += 1;
                log::warn!("{}", e);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

/// Replay a live stream until end of input
pub fn run_live<W: Write>(
    source: &Path,
    protocol: LiveProtocol,
    decoder: &Decoder,
    config: &DecoderConfig,
    writer: &mut SignalWriter<W>,
) -> Result<LiveSummary> {
    log::info!("Reading live {} stream from {:?}", protocol, source);

    let mut input: Box<dyn Read> = if source == Path::new("-") {
        Box::new(io::stdin().lock())
    } else {
        Box::new(
            File::open(source).with_context(|| format!("Failed to open live source: {:?}", source))?,
        )
    };

    let mut framer = LiveFramer::new(protocol).with_max_frame_len(config.max_live_frame_len);
    let mut session = LiveSession {
        decoder,
        config,
        reported_ids: HashSet::new(),
        summary: LiveSummary::default(),
    };

    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let n = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Failed to read live source"),
        };

        for result in framer.feed(&chunk[..n]) {
            match result {
                Ok(frame) => session.handle_frame(&frame, writer)?,
                Err(e) => log::debug!("Dropped live frame: {}", e),
            }
        }
        writer.flush()?;
    }

    if framer.state() == FramerState::Accumulating {
        log::debug!("Live stream ended inside a frame");
    }

    session.summary.framer = framer.stats();
    Ok(session.summary)
}
