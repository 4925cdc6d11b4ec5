//! Standalone CAN telemetry log decoder tool
//!
//! Decodes one log file and displays data points with their catalog names,
//! expanding flag signals into their named status bits.
//!
//! Usage:
//!   decode_log <log_file> [--format textual1|textual2] [--limit <count>]
//!
//! Example:
//!   decode_log run-07.log --format textual2 --limit 100

use can_telemetry_decoder::{catalog, Decoder, DecoderConfig, ErrorKind, LogFormat};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <log_file> [--format textual1|textual2] [--limit <count>]", args[0]);
        std::process::exit(1);
    }

    let log_path = PathBuf::from(&args[1]);
    let mut format = LogFormat::default();
    let mut limit = usize::MAX;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--format" if i + 1 < args.len() => {
                format = match args[i + 1].parse() {
                    Ok(f) => f,
                    Err(e) => {
                        eprintln!("{}", e);
                        std::process::exit(1);
                    }
                };
                i += 2;
            }
            "--limit" if i + 1 < args.len() => {
                limit = args[i + 1].parse().unwrap_or(usize::MAX);
                i += 2;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    let decoder = Decoder::new();
    let config = DecoderConfig::new().with_log_format(format);
    let log = match decoder.decode_file(&log_path, &config) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Failed to decode {:?}: {}", log_path, e);
            std::process::exit(1);
        }
    };

    let mut per_signal: HashMap<u16, usize> = HashMap::new();
    for point in log.records.iter().take(limit) {
        *per_signal.entry(point.signal_id).or_insert(0) += 1;

        let Some(signal) = catalog::signal(point.signal_id) else {
            continue;
        };
        println!(
            "[{}] {:>3} {:<32} {} {}",
            point.timestamp.format("%H:%M:%S%.3f"),
            point.signal_id,
            signal.name,
            point.value,
            signal.unit
        );
        if let Ok(statuses) = catalog::statuses(point.signal_id, &point.value) {
            for (name, set) in statuses.into_iter().filter(|(_, set)| *set) {
                println!("      {} = {}", name, set);
            }
        }
    }

    println!("\n=== DECODING SUMMARY ===");
    println!("Lines read: {}", log.stats.lines_read);
    println!("Frames decoded: {}", log.stats.frames_decoded);
    println!("Data points: {}", log.stats.signals_emitted);
    for kind in [
        ErrorKind::IncompleteFrame,
        ErrorKind::MalformedFrame,
        ErrorKind::UnknownIdentifier,
        ErrorKind::Decode,
    ] {
        println!("{} errors: {}", kind, log.stats.errors_of(kind));
    }

    if !per_signal.is_empty() {
        println!("\nTop 10 Most Frequent Signals:");
        let mut sorted: Vec<_> = per_signal.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        for (id, count) in sorted.into_iter().take(10) {
            let name = catalog::signal(id).map(|s| s.name).unwrap_or("?");
            println!("  {}: {} times", name, count);
        }
    }
}
