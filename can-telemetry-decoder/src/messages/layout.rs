//! Message layouts
//!
//! A layout describes where each signal lives inside a payload and which
//! scaling formula turns it into a physical value. The set of signals a layout
//! emits is fixed at compile time.

use crate::codec;
use crate::scaling::Scaling;
use crate::types::{DecoderError, Result, SignalId, SignalValue};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Where a raw field is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Unsigned byte at offset
    Byte(usize),
    /// 8-bit two's-complement byte at offset
    SignedByte(usize),
    /// `(data[byte] >> shift) & mask`
    Bits { byte: usize, shift: u8, mask: u8 },
    /// Unsigned big-endian 16-bit word at offset
    U16Be(usize),
    /// Signed big-endian 16-bit word at offset
    I16Be(usize),
    /// Unsigned little-endian 16-bit word at offset
    U16Le(usize),
    /// Signed little-endian 16-bit word at offset
    I16Le(usize),
    /// Unsigned little-endian 32-bit word at offset
    U32Le(usize),
    /// Signed little-endian 32-bit word at offset
    I32Le(usize),
    /// Little-endian bit range (Intel numbering)
    Packed { start_bit: usize, length: usize },
    /// Little-endian word of `width` bytes rendered as a binary flag register
    FlagRegister { offset: usize, width: usize },
}

impl Source {
    /// Number of payload bytes needed to read this field
    pub const fn required_len(&self) -> usize {
        match *self {
            Source::Byte(i) | Source::SignedByte(i) => i + 1,
            Source::Bits { byte, .. } => byte + 1,
            Source::U16Be(i) | Source::I16Be(i) | Source::U16Le(i) | Source::I16Le(i) => i + 2,
            Source::U32Le(i) | Source::I32Le(i) => i + 4,
            Source::Packed { start_bit, length } => (start_bit + length + 7) / 8,
            Source::FlagRegister { offset, width } => offset + width,
        }
    }

    /// Read the raw integer; the caller has checked `required_len`
    fn read(&self, data: &[u8]) -> i64 {
        match *self {
            Source::Byte(i) => i64::from(data[i]),
            Source::SignedByte(i) => i64::from(data[i] as i8),
            Source::Bits { byte, shift, mask } => i64::from((data[byte] >> shift) & mask),
            Source::U16Be(i) => i64::from(BigEndian::read_u16(&data[i..i + 2])),
            Source::I16Be(i) => i64::from(BigEndian::read_i16(&data[i..i + 2])),
            Source::U16Le(i) => i64::from(LittleEndian::read_u16(&data[i..i + 2])),
            Source::I16Le(i) => i64::from(LittleEndian::read_i16(&data[i..i + 2])),
            Source::U32Le(i) => i64::from(LittleEndian::read_u32(&data[i..i + 4])),
            Source::I32Le(i) => i64::from(LittleEndian::read_i32(&data[i..i + 4])),
            Source::Packed { start_bit, length } => {
                codec::extract_bits(data, start_bit, length) as i64
            }
            Source::FlagRegister { offset, width } => {
                codec::little_endian(&data[offset..offset + width]) as i64
            }
        }
    }
}

/// One signal inside a `Layout::Fields` table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub signal: SignalId,
    pub source: Source,
    pub scaling: Option<Scaling>,
}

impl Field {
    /// Field emitted as an unscaled integer (or flag register text)
    pub const fn raw(signal: SignalId, source: Source) -> Self {
        Self {
            signal,
            source,
            scaling: None,
        }
    }

    /// Field passed through a scaling formula
    pub const fn scaled(signal: SignalId, source: Source, scaling: Scaling) -> Self {
        Self {
            signal,
            source,
            scaling: Some(scaling),
        }
    }

    fn value(&self, data: &[u8]) -> SignalValue {
        let raw = self.source.read(data);
        match (self.source, self.scaling) {
            (Source::FlagRegister { width, .. }, _) => {
                SignalValue::Status(format!("{:0w$b}", raw as u64, w = width * 8))
            }
            (_, Some(scaling)) => SignalValue::Float(scaling.apply(raw)),
            (_, None) => SignalValue::Integer(raw),
        }
    }
}

/// How a message payload is turned into signals
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Layout {
    /// Independent fields at fixed positions
    Fields(&'static [Field]),
    /// `default_decode` words, each with an optional formula
    WordBank(&'static [(SignalId, Option<Scaling>)]),
    /// Per-cell report: id, instant voltage, open voltage, resistance, shunt flag
    CellReport(SignalId),
    /// Known message with nothing to decode
    Heartbeat,
}

impl Layout {
    /// Minimum payload length this layout reads
    pub fn required_len(&self) -> usize {
        match self {
            Layout::Fields(fields) => fields
                .iter()
                .map(|f| f.source.required_len())
                .max()
                .unwrap_or(0),
            Layout::WordBank(words) => words.len() * 2,
            Layout::CellReport(_) => 7,
            Layout::Heartbeat => 0,
        }
    }

    /// Signal ids this layout emits, in emission order
    pub fn signal_ids(&self) -> Vec<SignalId> {
        match self {
            Layout::Fields(fields) => fields.iter().map(|f| f.signal).collect(),
            Layout::WordBank(words) => words.iter().map(|(id, _)| *id).collect(),
            Layout::CellReport(id) => vec![*id],
            Layout::Heartbeat => Vec::new(),
        }
    }

    /// Decode a payload into `(signal id, value)` pairs
    ///
    /// Either every signal of the layout is produced or an error is returned.
    pub fn decode(&self, can_id: u32, data: &[u8]) -> Result<Vec<(SignalId, SignalValue)>> {
        let required = self.required_len();
        if data.len() < required {
            return Err(DecoderError::decode(
                can_id,
                format!("payload has {} bytes, layout needs {}", data.len(), required),
            ));
        }

        let values = match self {
            Layout::Fields(fields) => fields.iter().map(|f| (f.signal, f.value(data))).collect(),
            Layout::WordBank(words) => codec::default_decode(&data[..required])
                .into_iter()
                .zip(words.iter())
                .map(|(raw, (id, scaling))| {
                    let value = match scaling {
                        Some(s) => SignalValue::Float(s.apply(raw)),
                        None => SignalValue::Integer(raw),
                    };
                    (*id, value)
                })
                .collect(),
            Layout::CellReport(id) => vec![(*id, SignalValue::Status(cell_report(data)))],
            Layout::Heartbeat => Vec::new(),
        };

        Ok(values)
    }
}

fn cell_report(data: &[u8]) -> String {
    let cell_id = data[0];
    let instant_voltage = BigEndian::read_u16(&data[1..3]);
    // Bit 15 of the resistance word flags a shunted cell
    let internal_resistance = BigEndian::read_u16(&data[3..5]) & 0x7FFF;
    let shunted = (data[3] >> 7) & 1;
    let open_voltage = BigEndian::read_u16(&data[5..7]);
    format!(
        "{} {} {} {} {}",
        cell_id, instant_voltage, open_voltage, internal_resistance, shunted
    )
}
