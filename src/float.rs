//! Float and Double text records (IEEE 754, little-endian).
//!
//! Die Breite wird nie verengt: ein `f64` bleibt ein Double-Record, auch wenn
//! er als `f32` exakt darstellbar waere. Damit liefert der Reader denselben
//! Typ zurueck, den der Writer bekommen hat.

use std::fmt;

use crate::bytestream::{ByteReader, ByteWriter};
use crate::Result;

pub fn encode_f32(writer: &mut ByteWriter, value: f32) {
    writer.write_u32_le(value.to_bits());
}

pub fn decode_f32(reader: &mut ByteReader) -> Result<f32> {
    Ok(f32::from_bits(reader.read_u32_le()?))
}

pub fn encode_f64(writer: &mut ByteWriter, value: f64) {
    writer.write_u64_le(value.to_bits());
}

pub fn decode_f64(reader: &mut ByteReader) -> Result<f64> {
    Ok(f64::from_bits(reader.read_u64_le()?))
}

/// Lexikalische Form nach XML Schema (`INF`, `-INF`, `NaN`).
pub(crate) fn fmt_f32(value: f32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt_f64(f64::from(value), f)
}

pub(crate) fn fmt_f64(value: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value.is_nan() {
        f.write_str("NaN")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "INF" } else { "-INF" })
    } else {
        write!(f, "{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lexical(f64);

    impl fmt::Display for Lexical {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt_f64(self.0, f)
        }
    }

    #[test]
    fn f32_round_trip_bits() {
        for v in [0.0f32, -0.0, 1.5, f32::MIN_POSITIVE, f32::INFINITY, f32::NAN] {
            let mut w = ByteWriter::new();
            encode_f32(&mut w, v);
            let data = w.into_vec();
            assert_eq!(data.len(), 4);
            let mut r = ByteReader::new(&data);
            assert_eq!(decode_f32(&mut r).unwrap().to_bits(), v.to_bits());
        }
    }

    #[test]
    fn f64_round_trip_bits() {
        for v in [0.0f64, -0.0, 0.1, f64::MAX, f64::NEG_INFINITY, f64::NAN] {
            let mut w = ByteWriter::new();
            encode_f64(&mut w, v);
            let data = w.into_vec();
            assert_eq!(data.len(), 8);
            let mut r = ByteReader::new(&data);
            assert_eq!(decode_f64(&mut r).unwrap().to_bits(), v.to_bits());
        }
    }

    #[test]
    fn f32_layout() {
        let mut w = ByteWriter::new();
        encode_f32(&mut w, 1.0);
        assert_eq!(w.into_vec(), [0x00, 0x00, 0x80, 0x3F]);
    }

    #[test]
    fn lexical_specials() {
        assert_eq!(Lexical(f64::INFINITY).to_string(), "INF");
        assert_eq!(Lexical(f64::NEG_INFINITY).to_string(), "-INF");
        assert_eq!(Lexical(f64::NAN).to_string(), "NaN");
        assert_eq!(Lexical(2.5).to_string(), "2.5");
    }
}
