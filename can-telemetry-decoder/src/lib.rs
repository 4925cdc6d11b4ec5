//! CAN Telemetry Decoder Library
//!
//! A reusable library for turning raw vehicle CAN frames into named, typed,
//! physically scaled data points.
//!
//! # Architecture
//!
//! Frames come from one of two places:
//! - A live byte stream (USB CAN adapter or wireless link), framed by
//!   [`LiveFramer`] with start and end tokens
//! - Log file lines in one of the [`LogFormat`]s, parsed by [`parse_log_line`]
//!
//! Either way the resulting [`CanFrame`] goes through [`Decoder::decode_frame`],
//! which looks the identifier up in the message registry, runs its layout and
//! returns the data points. The registry and the signal catalog are static and
//! safe to share across threads.
//!
//! The library does NOT:
//! - Open serial ports or sockets
//! - Store, chart or export data points
//!
//! Output formatting and parallel file processing are in the application layer
//! (can-telemetry-cli).
//!
//! # Example Usage
//!
//! ```
//! use can_telemetry_decoder::{catalog, parse_log_line, Decoder, LogFormat};
//!
//! let decoder = Decoder::new();
//! let frame = parse_log_line("1659901910.121 514 8 54 0 10 0 0 0 0 0", LogFormat::Textual2)
//!     .unwrap();
//!
//! for point in decoder.decode_frame(&frame).unwrap() {
//!     let signal = catalog::signal(point.signal_id).unwrap();
//!     println!("{} {} = {} {}", point.timestamp, signal.name, point.value, signal.unit);
//! }
//! ```

// Public modules
pub mod codec;
pub mod config;
pub mod decoder;
pub mod formats;
pub mod messages;
pub mod processor;
pub mod scaling;
pub mod types;

// Re-export main types for convenience
pub use config::DecoderConfig;
pub use decoder::{merge_by_timestamp, Decoder};
pub use formats::{
    parse_hex_frame, parse_log_line, FramerStats, LiveFramer, LiveProtocol, LogFormat,
};
pub use messages::{catalog, MessageRegistry, RegistryStats, SignalDescriptor};
pub use processor::{DecodedLog, LogProcessor, ProcessingStats};
pub use scaling::Scaling;
pub use types::{
    CanFrame, DecodedSignal, DecoderError, ErrorKind, Result, SignalId, SignalValue, Timestamp,
    ValueKind,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
