//! Summary report
//!
//! Printed to stderr after decoding so stdout carries only data points.

use crate::live::LiveSummary;
use can_telemetry_decoder::{DecoderError, ErrorKind, ProcessingStats, RegistryStats};
use std::path::PathBuf;

/// Outcome of one log file job
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: Result<ProcessingStats, DecoderError>,
}

impl FileReport {
    pub fn failed(&self) -> bool {
        self.outcome.is_err()
    }
}

const ERROR_KINDS: [ErrorKind; 4] = [
    ErrorKind::IncompleteFrame,
    ErrorKind::MalformedFrame,
    ErrorKind::UnknownIdentifier,
    ErrorKind::Decode,
];

fn banner(title: &str) {
    eprintln!("═══════════════════════════════════════════════");
    eprintln!("  {}", title);
    eprintln!("═══════════════════════════════════════════════");
}

pub fn print_registry(stats: &RegistryStats) {
    eprintln!("\n📊 Message Registry:");
    eprintln!("  Messages:   {}", stats.num_messages);
    eprintln!("  Heartbeats: {}", stats.num_heartbeats);
    eprintln!("  Signals:    {}", stats.num_signals);
}

pub fn print_file_reports(reports: &[FileReport], written: usize) {
    banner("CAN Telemetry Decoder - Log Files");

    for report in reports {
        eprintln!("\n📄 {:?}", report.path);
        match &report.outcome {
            Ok(stats) => {
                eprintln!("  Lines:        {}", stats.lines_read);
                eprintln!("  Blank:        {}", stats.blank_lines);
                eprintln!("  Frames:       {}", stats.frames_decoded);
                eprintln!("  Data points:  {}", stats.signals_emitted);
                eprintln!("  Filtered:     {}", stats.filtered);
                eprintln!("  Errors:       {}", stats.errors());
                for kind in ERROR_KINDS {
                    let count = stats.errors_of(kind);
                    if count > 0 {
                        eprintln!("    {:<20} {}", kind.to_string(), count);
                    }
                }
                if stats.unknown_ids > 0 {
                    eprintln!("  Unknown IDs:  {}", stats.unknown_ids);
                }
            }
            Err(e) => eprintln!("  ✗ {}", e),
        }
    }

    let failed = reports.iter().filter(|r| r.failed()).count();
    eprintln!("\n───────────────────────────────────────────────");
    eprintln!(
        "  {} files, {} failed, {} data points written",
        reports.len(),
        failed,
        written
    );
}

pub fn print_live_report(summary: &LiveSummary, written: usize) {
    banner("CAN Telemetry Decoder - Live Stream");

    let framer = &summary.framer;
    eprintln!("\n📡 Framer:");
    eprintln!("  Frames:            {}", framer.frames);
    eprintln!("  Rejected:          {}", framer.failures);
    eprintln!("  Resync discards:   {}", framer.resync_discards);
    eprintln!("  Overflow discards: {}", framer.overflow_discards);
    eprintln!("  Ignored bytes:     {}", framer.ignored_bytes);

    eprintln!("\n🔎 Decoding:");
    eprintln!("  Frames decoded:    {}", summary.frames_decoded);
    eprintln!("  Filtered:          {}", summary.filtered);
    eprintln!("  Decode errors:     {}", summary.decode_errors);
    eprintln!("  Unknown IDs:       {}", summary.unknown_ids);
    eprintln!("  Data points:       {}", written);
}
