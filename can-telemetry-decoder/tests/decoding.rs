//! End-to-end decoding: parsers, dispatcher and file jobs

use can_telemetry_decoder::{
    merge_by_timestamp, parse_log_line, CanFrame, Decoder, DecoderConfig, DecoderError, ErrorKind,
    LiveFramer, LiveProtocol, LogFormat, SignalValue,
};
use chrono::DateTime;
use std::io::Write;
use tempfile::NamedTempFile;

const CURRENT_LIMITS_LINE: &str = "1659901910.121 514 8 54 0 10 0 0 0 0 0";

fn write_log(lines: &[&str]) -> NamedTempFile {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_current_limits_scenario() {
    let frame = parse_log_line(CURRENT_LIMITS_LINE, LogFormat::Textual2).unwrap();
    assert_eq!(frame.can_id(), 514);
    assert_eq!(
        frame.timestamp(),
        DateTime::from_timestamp(1_659_901_910, 121_000_000).unwrap()
    );

    let points = Decoder::new().decode_frame(&frame).unwrap();
    let values: Vec<(u16, SignalValue)> =
        points.iter().map(|p| (p.signal_id, p.value.clone())).collect();
    assert_eq!(
        values,
        vec![(89, SignalValue::Integer(54)), (90, SignalValue::Integer(10))]
    );
    assert!(points.iter().all(|p| p.timestamp == frame.timestamp()));
}

#[test]
fn test_cell_location_nibbles() {
    let ts = DateTime::from_timestamp(0, 0).unwrap();
    let frame = CanFrame::new(ts, 4, vec![0x0F, 0xA0, 0x23, 0x0F, 0x00, 0x51, 0x0F, 0x50]).unwrap();
    let points = Decoder::new().decode_frame(&frame).unwrap();
    let value_of = |id: u16| {
        points
            .iter()
            .find(|p| p.signal_id == id)
            .map(|p| p.value.clone())
            .unwrap()
    };

    assert_eq!(value_of(13), SignalValue::Integer(4000));
    assert_eq!(value_of(121), SignalValue::Integer(0x3));
    assert_eq!(value_of(122), SignalValue::Integer(0x2));
    assert_eq!(value_of(15), SignalValue::Integer(3840));
    assert_eq!(value_of(123), SignalValue::Integer(0x1));
    assert_eq!(value_of(124), SignalValue::Integer(0x5));
    assert_eq!(value_of(17), SignalValue::Integer(3920));
}

#[test]
fn test_decode_frame_is_deterministic() {
    let decoder = Decoder::new();
    let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    for message in decoder_messages() {
        let frame = CanFrame::new(ts, message, vec![0x9C, 0xFF, 0x10, 0x27, 0x80, 0x01, 0xFE, 0x7F])
            .unwrap();
        let first = decoder.decode_frame(&frame).unwrap();
        let second = decoder.decode_frame(&frame).unwrap();
        assert_eq!(first, second, "0x{:X}", message);
    }
}

fn decoder_messages() -> Vec<u32> {
    can_telemetry_decoder::MessageRegistry::global()
        .messages()
        .iter()
        .map(|m| m.can_id)
        .collect()
}

#[test]
fn test_live_and_log_paths_agree() {
    let decoder = Decoder::new();
    let from_log = decoder
        .decode_frame(&parse_log_line(CURRENT_LIMITS_LINE, LogFormat::Textual2).unwrap())
        .unwrap();

    let mut xbee = LiveFramer::new(LiveProtocol::XBEE);
    let wire = format!("s{}\n", CURRENT_LIMITS_LINE);
    let xbee_frames = xbee.feed(wire.as_bytes());
    assert_eq!(xbee_frames.len(), 1);
    let from_xbee = decoder
        .decode_frame(xbee_frames[0].as_ref().unwrap())
        .unwrap();

    let mut candapter = LiveFramer::new(LiveProtocol::CANDAPTER);
    let candapter_frames = candapter.feed(b"T202836000A00000000001659901910121\r");
    assert_eq!(candapter_frames.len(), 1);
    let from_candapter = decoder
        .decode_frame(candapter_frames[0].as_ref().unwrap())
        .unwrap();

    assert_eq!(from_log, from_xbee);
    assert_eq!(from_log, from_candapter);
}

#[test]
fn test_decode_file_skips_bad_lines() {
    let file = write_log(&[
        CURRENT_LIMITS_LINE,
        "",
        "1659901910.200 514 8 54 0 10 0 0",
        "1659901910.300 3 1 1",
        "1659901910.400 4095 1 0",
    ]);

    let decoder = Decoder::new();
    let log = decoder
        .decode_file(file.path(), &DecoderConfig::new())
        .unwrap();

    assert_eq!(log.stats.lines_read, 5);
    assert_eq!(log.stats.blank_lines, 1);
    assert_eq!(log.stats.frames_decoded, 2);
    assert_eq!(log.stats.errors_of(ErrorKind::IncompleteFrame), 1);
    assert_eq!(log.stats.errors_of(ErrorKind::UnknownIdentifier), 1);
    assert_eq!(log.records.len(), 3);
}

#[test]
fn test_decode_file_textual1() {
    let file = write_log(&[
        "2021-01-01T00:00:00.003Z 514 8 [54,0,10,0,0,0,0,0]",
        "2021-01-01T00:00:00.010Z 3 1 [1]",
    ]);

    let config = DecoderConfig::new().with_log_format(LogFormat::Textual1);
    let log = Decoder::new().decode_file(file.path(), &config).unwrap();
    assert_eq!(log.stats.errors(), 0);
    assert_eq!(log.records.len(), 3);
}

#[test]
fn test_decode_file_error_limit() {
    let bad: Vec<&str> = std::iter::repeat("not a frame").take(5).collect();
    let file = write_log(&bad);

    let config = DecoderConfig::new().with_max_errors(4);
    let err = Decoder::new().decode_file(file.path(), &config).unwrap_err();
    assert!(matches!(err, DecoderError::TooManyErrors { errors: 5, limit: 4 }));
    assert!(!err.is_recoverable());
}

#[test]
fn test_decode_file_missing() {
    let err = Decoder::new()
        .decode_file(std::path::Path::new("/nonexistent/run.log"), &DecoderConfig::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_decode_file_streams_points() {
    let lines: Vec<String> = (0..500)
        .map(|i| format!("1659901910.{:03} 514 4 54 0 10 0", i))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let file = write_log(&refs);

    let mut count = 0;
    let mut last = None;
    let stats = Decoder::new()
        .decode_file_with(file.path(), &DecoderConfig::new(), |point| {
            count += 1;
            last = Some(point);
            Ok(())
        })
        .unwrap();

    assert_eq!(count, 1000);
    assert_eq!(stats.signals_emitted, 1000);
    assert_eq!(stats.frames_decoded, 500);
    let last = last.unwrap();
    assert_eq!(last.signal_id, 90);
    assert_eq!(
        last.timestamp,
        DateTime::from_timestamp(1_659_901_910, 499_000_000).unwrap()
    );
}

#[test]
fn test_merge_files_by_timestamp() {
    let first = write_log(&["1.0 3 1 1", "3.0 3 1 3"]);
    let second = write_log(&["2.0 3 1 2", "4.0 3 1 4"]);

    let decoder = Decoder::new();
    let config = DecoderConfig::new();
    let logs: Vec<_> = [&first, &second]
        .iter()
        .map(|f| decoder.decode_file(f.path(), &config).unwrap().records)
        .collect();

    let merged = merge_by_timestamp(logs);
    let values: Vec<SignalValue> = merged.into_iter().map(|p| p.value).collect();
    assert_eq!(
        values,
        (1..=4).map(SignalValue::Integer).collect::<Vec<_>>()
    );
}

#[test]
fn test_data_point_json() {
    let frame = parse_log_line("1659901910.121 3 1 1", LogFormat::Textual2).unwrap();
    let points = Decoder::new().decode_frame(&frame).unwrap();
    let json = serde_json::to_value(&points[0]).unwrap();
    assert_eq!(json["signal_id"], 12);
    assert_eq!(json["value"], 1);
    assert_eq!(json["timestamp"], "2022-08-07T19:51:50.121Z");
}
