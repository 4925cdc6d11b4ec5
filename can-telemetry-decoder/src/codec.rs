//! Scalar codecs
//!
//! Stateless conversions from raw payload bytes to integers. Every message layout
//! is built from these, so they never panic on short or empty input.

use crate::types::{DecoderError, Result};

/// Bit width assumed for two's-complement fields unless a layout says otherwise
pub const DEFAULT_SIGN_BITS: u32 = 16;

/// Concatenate bytes most-significant first
///
/// `big_endian(&[])` is 0. Inputs longer than 8 bytes keep the low 64 bits.
pub fn big_endian(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Concatenate bytes least-significant first
pub fn little_endian(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Reinterpret the low `bits` bits of `value` as a signed two's-complement number
///
/// # Errors
/// `Configuration` if `bits` is not in `1..=64`.
pub fn twos_complement(value: u64, bits: u32) -> Result<i64> {
    if bits == 0 || bits > 64 {
        return Err(DecoderError::Configuration(format!(
            "two's complement width must be 1..=64 bits, got {}",
            bits
        )));
    }
    Ok(sign_extend(value, bits))
}

/// Sign-extend a value from N bits to 64 bits
///
/// If the value's MSB is 1, fill the upper bits with 1s.
fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits >= 64 {
        return value as i64;
    }

    let value = value & ((1u64 << bits) - 1);
    let sign_bit = 1u64 << (bits - 1);
    if (value & sign_bit) != 0 {
        (value | (!0u64 << bits)) as i64
    } else {
        value as i64
    }
}

/// Split bytes into consecutive chunks of `size`; the last chunk may be short
///
/// # Errors
/// `Configuration` if `size` is zero.
pub fn group_bytes(bytes: &[u8], size: usize) -> Result<Vec<&[u8]>> {
    if size == 0 {
        return Err(DecoderError::Configuration(
            "byte group size must be positive".to_string(),
        ));
    }
    Ok(bytes.chunks(size).collect())
}

/// The decode structure shared by most inverter messages
///
/// Pairs of bytes, little-endian, then 16-bit two's complement.
pub fn default_decode(bytes: &[u8]) -> Vec<i64> {
    bytes
        .chunks(2)
        .map(|word| sign_extend(little_endian(word), DEFAULT_SIGN_BITS))
        .collect()
}

/// Extract `length` bits starting at `start_bit` (Intel bit numbering)
///
/// Bits are numbered from the LSB of byte 0 upwards. Bits past the end of
/// `data` read as zero; layouts check the payload length before calling this.
pub fn extract_bits(data: &[u8], start_bit: usize, length: usize) -> u64 {
    let mut result: u64 = 0;

    for i in 0..length.min(64) {
        let bit_pos = start_bit + i;
        let byte_idx = bit_pos / 8;
        let bit_in_byte = bit_pos % 8;

        if let Some(byte) = data.get(byte_idx) {
            let bit_value = (byte >> bit_in_byte) & 0x01;
            result |= u64::from(bit_value) << i;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endianness_of_empty_input() {
        assert_eq!(big_endian(&[]), 0);
        assert_eq!(little_endian(&[]), 0);
    }

    #[test]
    fn test_big_endian_is_reversed_little_endian() {
        let samples: [&[u8]; 5] = [
            &[0x12],
            &[0x12, 0x34],
            &[0xAB, 0xCD, 0xEF],
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08],
            &[0xFF, 0x00, 0xFF, 0x00, 0x80],
        ];
        for bytes in samples {
            let reversed: Vec<u8> = bytes.iter().rev().copied().collect();
            assert_eq!(big_endian(bytes), little_endian(&reversed), "{:02X?}", bytes);
        }
        assert_eq!(big_endian(&[0x12, 0x34]), 0x1234);
        assert_eq!(little_endian(&[0x12, 0x34]), 0x3412);
    }

    #[test]
    fn test_twos_complement_widths() {
        assert_eq!(twos_complement(0xFF, 8).unwrap(), -1);
        assert_eq!(twos_complement(0x7F, 8).unwrap(), 127);
        assert_eq!(twos_complement(0x8000, 16).unwrap(), -32768);
        assert_eq!(twos_complement(0xFFFF_FFFF, 32).unwrap(), -1);
        assert_eq!(twos_complement(0xFF, DEFAULT_SIGN_BITS).unwrap(), 255);
    }

    #[test]
    fn test_twos_complement_round_trip_16bit() {
        for original in [-32768i64, -12345, -1, 0, 1, 300, 32767] {
            let encoded = (original as u64) & 0xFFFF;
            assert_eq!(twos_complement(encoded, 16).unwrap(), original);
        }
    }

    #[test]
    fn test_every_u16_round_trips_both_orders() {
        for value in 0..=u16::MAX {
            let be = value.to_be_bytes();
            let le = value.to_le_bytes();
            assert_eq!(big_endian(&be), u64::from(value));
            assert_eq!(little_endian(&le), u64::from(value));
            assert_eq!(big_endian(&be), little_endian(&[be[1], be[0]]));
        }
    }

    #[test]
    fn test_twos_complement_every_16_bit_value() {
        for raw in 0..=u16::MAX {
            let decoded = twos_complement(u64::from(raw), 16).unwrap();
            assert_eq!(decoded, i64::from(raw as i16));
            assert_eq!((decoded as u64) & 0xFFFF, u64::from(raw));
        }
        for raw in 0..=u8::MAX {
            assert_eq!(twos_complement(u64::from(raw), 8).unwrap(), i64::from(raw as i8));
        }
    }

    #[test]
    fn test_twos_complement_rejects_bad_width() {
        assert!(matches!(
            twos_complement(1, 0),
            Err(DecoderError::Configuration(_))
        ));
        assert!(twos_complement(1, 65).is_err());
    }

    #[test]
    fn test_group_bytes_short_tail() {
        let groups = group_bytes(&[1, 2, 3, 4, 5], 2).unwrap();
        assert_eq!(groups, vec![&[1u8, 2][..], &[3, 4][..], &[5][..]]);
        assert!(group_bytes(&[1, 2], 0).is_err());
        assert!(group_bytes(&[], 2).unwrap().is_empty());
    }

    #[test]
    fn test_default_decode() {
        // 0x00FA = 250, 0xFF38 = -200, 0x8000 = -32768, 0x7FFF = 32767
        let data = [0xFA, 0x00, 0x38, 0xFF, 0x00, 0x80, 0xFF, 0x7F];
        assert_eq!(default_decode(&data), vec![250, -200, -32768, 32767]);
        assert_eq!(default_decode(&data), default_decode(&data));
    }

    #[test]
    fn test_extract_bits_cross_byte() {
        let data = [0xAB, 0xCD, 0xEF, 0x12];
        assert_eq!(extract_bits(&data, 0, 8), 0xAB);
        assert_eq!(extract_bits(&data, 0, 16), 0xCDAB);
        assert_eq!(extract_bits(&data, 4, 8), 0xDA);
        // 10-bit field starting at bit 10
        assert_eq!(extract_bits(&data, 10, 10), (0x12EFCDAB_u64 >> 10) & 0x3FF);
    }
}
