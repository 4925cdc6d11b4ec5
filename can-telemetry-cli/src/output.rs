//! Data point output
//!
//! One line per data point, either `timestamp signal_id name value unit` or a
//! JSON object per line.

use can_telemetry_decoder::{catalog, DecodedSignal, SignalId, SignalValue};
use chrono::SecondsFormat;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct JsonRecord<'a> {
    timestamp: String,
    signal_id: SignalId,
    name: &'a str,
    value: &'a SignalValue,
    unit: &'a str,
}

/// Writes data points to any sink
pub struct SignalWriter<W: Write> {
    sink: W,
    json: bool,
    written: usize,
}

impl<W: Write> SignalWriter<W> {
    pub fn new(sink: W, json: bool) -> Self {
        Self {
            sink,
            json,
            written: 0,
        }
    }

    pub fn write_point(&mut self, point: &DecodedSignal) -> io::Result<()> {
        let (name, unit) = match catalog::signal(point.signal_id) {
            Some(descriptor) => (descriptor.name, descriptor.unit),
            None => ("", ""),
        };
        let timestamp = point
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        if self.json {
            let record = JsonRecord {
                timestamp,
                signal_id: point.signal_id,
                name,
                value: &point.value,
                unit,
            };
            serde_json::to_writer(&mut self.sink, &record)?;
            writeln!(self.sink)?;
        } else {
            let line = format!(
                "{} {} {} {} {}",
                timestamp, point.signal_id, name, point.value, unit
            );
            writeln!(self.sink, "{}", line.trim_end())?;
        }

        self.written += 1;
        Ok(())
    }

    pub fn write_all(&mut self, points: &[DecodedSignal]) -> io::Result<()> {
        for point in points {
            self.write_point(point)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Data points written so far
    pub fn written(&self) -> usize {
        self.written
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn point(signal_id: SignalId, value: SignalValue) -> DecodedSignal {
        DecodedSignal {
            timestamp: DateTime::from_timestamp(1_659_901_910, 121_000_000).unwrap(),
            signal_id,
            value,
        }
    }

    #[test]
    fn test_text_lines() {
        let mut writer = SignalWriter::new(Vec::new(), false);
        writer.write_point(&point(89, SignalValue::Integer(54))).unwrap();
        writer.write_point(&point(18, SignalValue::Float(25.3))).unwrap();
        assert_eq!(writer.written(), 2);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2022-08-07T19:51:50.121Z 89 Pack DCL 54");
        assert_eq!(
            lines[1],
            "2022-08-07T19:51:50.121Z 18 Module A Temperature 25.300 Degrees C"
        );
    }

    #[test]
    fn test_json_lines() {
        let mut writer = SignalWriter::new(Vec::new(), true);
        writer.write_point(&point(90, SignalValue::Integer(10))).unwrap();

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let json: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(json["signal_id"], 90);
        assert_eq!(json["name"], "Pack CCL");
        assert_eq!(json["value"], 10);
        assert_eq!(json["timestamp"], "2022-08-07T19:51:50.121Z");
    }
}
