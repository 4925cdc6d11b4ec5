//! CAN Telemetry CLI Application
//!
//! This is the command-line interface for the CAN telemetry decoder.
//! It uses the can-telemetry-decoder library and adds:
//! - Parallel decoding of several log files, merged in timestamp order
//! - Replay of live captures from a file or stdin
//! - Text or JSON lines output
//! - A summary report

use anyhow::{Context, Result};
use can_telemetry_decoder::{
    merge_by_timestamp, Decoder, DecoderConfig, DecoderError, LiveProtocol, LogFormat,
};
use clap::Parser;
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

mod config;
mod live;
mod output;
mod report;

use config::AppConfig;
use output::SignalWriter;
use report::FileReport;

/// CAN Telemetry - Decode vehicle CAN logs and live captures
#[derive(Parser, Debug)]
#[command(name = "can-telemetry-cli")]
#[command(about = "Decode vehicle CAN telemetry logs and live captures", long_about = None)]
#[command(version)]
struct Args {
    /// Log file to decode (can be repeated)
    #[arg(short, long, value_name = "FILE")]
    log: Vec<PathBuf>,

    /// Log line format: textual1 or textual2
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<LogFormat>,

    /// Live capture to replay, or "-" for stdin
    #[arg(long, value_name = "FILE")]
    live: Option<PathBuf>,

    /// Live framing protocol: candapter or xbee
    #[arg(short, long, value_name = "PROTOCOL")]
    protocol: Option<LiveProtocol>,

    /// Errors tolerated per log file before it is aborted
    #[arg(long, value_name = "COUNT")]
    max_errors: Option<usize>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output file for decoded data points (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write JSON lines instead of text
    #[arg(long)]
    json: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Telemetry CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", can_telemetry_decoder::VERSION);

    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    let decoder_config = merge_decoder_config(&args, &app_config);

    let files = if args.log.is_empty() {
        app_config.input.files.clone()
    } else {
        args.log.clone()
    };
    let live_source = args.live.clone().or_else(|| app_config.live.source.clone());

    if files.is_empty() && live_source.is_none() {
        println!("CAN Telemetry - No input specified");
        println!("\nQuick Start:");
        println!("  can-telemetry-cli --log run-07.log");
        println!("  can-telemetry-cli --log run-07.log --format textual1 --json");
        println!("  can-telemetry-cli --live capture.bin --protocol candapter");
        println!("\nUse --help for more options");
        return Ok(());
    }

    let output_path = args.output.clone().or_else(|| app_config.output.path.clone());
    let sink: Box<dyn Write> = match &output_path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut writer = SignalWriter::new(sink, args.json || app_config.output.json);

    let decoder = Decoder::new();
    if !args.quiet {
        report::print_registry(&decoder.registry_stats());
    }

    if let Some(source) = live_source {
        let protocol = args
            .protocol
            .or(app_config.live.protocol)
            .unwrap_or(LiveProtocol::CANDAPTER);
        let summary = live::run_live(&source, protocol, &decoder, &decoder_config, &mut writer)?;
        writer.flush()?;
        if !args.quiet {
            report::print_live_report(&summary, writer.written());
        }
        return Ok(());
    }

    let reports = decode_files(&decoder, &files, &decoder_config, &mut writer)?;
    writer.flush()?;
    if !args.quiet {
        report::print_file_reports(&reports, writer.written());
    }

    let failed: Vec<&FileReport> = reports.iter().filter(|r| r.failed()).collect();
    if !failed.is_empty() {
        for report in &failed {
            if let Err(e) = &report.outcome {
                log::error!("{:?}: {}", report.path, e);
            }
        }
        anyhow::bail!("{} of {} log files failed", failed.len(), reports.len());
    }

    Ok(())
}

/// Decode the log files and write their data points in timestamp order
///
/// A single file streams straight to the writer. Several files are decoded on
/// the rayon pool and their results merged.
fn decode_files<W: Write>(
    decoder: &Decoder,
    files: &[PathBuf],
    config: &DecoderConfig,
    writer: &mut SignalWriter<W>,
) -> Result<Vec<FileReport>> {
    if let [path] = files {
        let outcome = decoder.decode_file_with(path, config, |point| {
            writer.write_point(&point).map_err(DecoderError::from)
        });
        return Ok(vec![FileReport {
            path: path.clone(),
            outcome,
        }]);
    }

    let results: Vec<_> = files
        .par_iter()
        .map(|path| (path.clone(), decoder.decode_file(path, config)))
        .collect();

    let mut decoded = Vec::with_capacity(results.len());
    let mut reports = Vec::with_capacity(results.len());
    for (path, result) in results {
        match result {
            Ok(log) => {
                decoded.push(log.records);
                reports.push(FileReport {
                    path,
                    outcome: Ok(log.stats),
                });
            }
            Err(e) => reports.push(FileReport {
                path,
                outcome: Err(e),
            }),
        }
    }

    writer.write_all(&merge_by_timestamp(decoded))?;
    Ok(reports)
}

/// Apply CLI overrides on top of the configuration file
fn merge_decoder_config(args: &Args, app_config: &AppConfig) -> DecoderConfig {
    let mut config = app_config.effective_decoder_config();
    if let Some(format) = args.format {
        config = config.with_log_format(format);
    }
    if let Some(max_errors) = args.max_errors {
        config = config.with_max_errors(max_errors);
    }
    config
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
