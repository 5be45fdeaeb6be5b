//! Integer text records.
//!
//! Ein Integer wird mit dem schmalsten Tag geschrieben, der ihn exakt
//! traegt. Die Auswahl ist eine Prioritaetstabelle aus (Praedikat, Tag);
//! der erste Treffer gewinnt. Werte oberhalb von `i64::MAX` nutzen UInt64.

use crate::bytestream::{ByteReader, ByteWriter};
use crate::record::TextRecord;
use crate::{Error, Result};

fn is_zero(v: i64) -> bool {
    v == 0
}

fn is_one(v: i64) -> bool {
    v == 1
}

fn fits_i8(v: i64) -> bool {
    i8::try_from(v).is_ok()
}

fn fits_i16(v: i64) -> bool {
    i16::try_from(v).is_ok()
}

fn fits_i32(v: i64) -> bool {
    i32::try_from(v).is_ok()
}

fn always(_: i64) -> bool {
    true
}

/// Prioritaetstabelle fuer vorzeichenbehaftete Werte.
static NARROWING: [(fn(i64) -> bool, TextRecord); 6] = [
    (is_zero, TextRecord::Zero),
    (is_one, TextRecord::One),
    (fits_i8, TextRecord::Int8),
    (fits_i16, TextRecord::Int16),
    (fits_i32, TextRecord::Int32),
    (always, TextRecord::Int64),
];

/// Schmalster Text-Record fuer `value`.
pub fn select(value: i64) -> TextRecord {
    NARROWING
        .iter()
        .find(|(fits, _)| fits(value))
        .map_or(TextRecord::Int64, |&(_, record)| record)
}

/// Schreibt die Payload von `value` fuer den gewaehlten Record.
///
/// `record` muss aus [`select`] stammen (oder breiter sein).
pub fn encode(writer: &mut ByteWriter, record: TextRecord, value: i64) -> Result<()> {
    match record {
        TextRecord::Zero | TextRecord::One => {}
        TextRecord::Int8 => writer.write_bytes(&narrow::<i8>(value)?.to_le_bytes()),
        TextRecord::Int16 => writer.write_bytes(&narrow::<i16>(value)?.to_le_bytes()),
        TextRecord::Int32 => writer.write_bytes(&narrow::<i32>(value)?.to_le_bytes()),
        TextRecord::Int64 => writer.write_bytes(&value.to_le_bytes()),
        other => return Err(Error::out_of_range(format!("{} is not an integer record", other.name()))),
    }
    Ok(())
}

fn narrow<T: TryFrom<i64>>(value: i64) -> Result<T> {
    T::try_from(value).map_err(|_| Error::out_of_range(format!("{value} does not fit the record width")))
}

/// Liest die Payload eines Integer-Records.
pub fn decode(reader: &mut ByteReader, record: TextRecord) -> Result<i64> {
    Ok(match record {
        TextRecord::Zero => 0,
        TextRecord::One => 1,
        TextRecord::Int8 => i64::from(i8::from_le_bytes(reader.read_array()?)),
        TextRecord::Int16 => i64::from(i16::from_le_bytes(reader.read_array()?)),
        TextRecord::Int32 => i64::from(i32::from_le_bytes(reader.read_array()?)),
        TextRecord::Int64 => i64::from_le_bytes(reader.read_array()?),
        other => {
            return Err(Error::invalid_payload(
                reader.position(),
                format!("{} is not an integer record", other.name()),
            ));
        }
    })
}

/// UInt64-Payload (nur fuer Werte oberhalb von `i64::MAX`).
pub fn encode_u64(writer: &mut ByteWriter, value: u64) {
    writer.write_u64_le(value);
}

pub fn decode_u64(reader: &mut ByteReader) -> Result<u64> {
    reader.read_u64_le()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_vec(value: i64) -> (TextRecord, Vec<u8>) {
        let record = select(value);
        let mut w = ByteWriter::new();
        encode(&mut w, record, value).unwrap();
        (record, w.into_vec())
    }

    fn round_trip(value: i64) -> i64 {
        let (record, data) = encode_vec(value);
        let mut r = ByteReader::new(&data);
        let v = decode(&mut r, record).unwrap();
        assert!(r.is_at_end());
        v
    }

    #[test]
    fn zero_and_one_have_no_payload() {
        assert_eq!(encode_vec(0), (TextRecord::Zero, vec![]));
        assert_eq!(encode_vec(1), (TextRecord::One, vec![]));
    }

    #[test]
    fn narrowest_width_is_chosen() {
        assert_eq!(select(2), TextRecord::Int8);
        assert_eq!(select(-1), TextRecord::Int8);
        assert_eq!(select(127), TextRecord::Int8);
        assert_eq!(select(-128), TextRecord::Int8);
        assert_eq!(select(128), TextRecord::Int16);
        assert_eq!(select(-32768), TextRecord::Int16);
        assert_eq!(select(32768), TextRecord::Int32);
        assert_eq!(select(i64::from(i32::MIN)), TextRecord::Int32);
        assert_eq!(select(i64::from(i32::MAX) + 1), TextRecord::Int64);
        assert_eq!(select(i64::MIN), TextRecord::Int64);
    }

    #[test]
    fn payload_little_endian() {
        assert_eq!(encode_vec(42), (TextRecord::Int8, vec![42]));
        assert_eq!(encode_vec(-2), (TextRecord::Int8, vec![0xFE]));
        assert_eq!(encode_vec(0x1234), (TextRecord::Int16, vec![0x34, 0x12]));
    }

    #[test]
    fn round_trip_boundaries() {
        for v in [
            0,
            1,
            -1,
            2,
            i64::from(i8::MIN),
            i64::from(i8::MAX) + 1,
            i64::from(i16::MIN) - 1,
            i64::from(i32::MAX),
            i64::MIN,
            i64::MAX,
        ] {
            assert_eq!(round_trip(v), v);
        }
    }

    #[test]
    fn encode_rejects_too_narrow_record() {
        let mut w = ByteWriter::new();
        assert!(encode(&mut w, TextRecord::Int8, 300).is_err());
        assert!(encode(&mut w, TextRecord::Chars8, 3).is_err());
    }

    #[test]
    fn decode_truncated_payload() {
        let data = [0x01];
        let mut r = ByteReader::new(&data);
        assert!(matches!(
            decode(&mut r, TextRecord::Int32),
            Err(Error::PrematureEndOfStream { .. })
        ));
    }

    #[test]
    fn u64_payload() {
        let mut w = ByteWriter::new();
        encode_u64(&mut w, u64::MAX);
        let data = w.into_vec();
        assert_eq!(data, [0xFF; 8]);
        let mut r = ByteReader::new(&data);
        assert_eq!(decode_u64(&mut r).unwrap(), u64::MAX);
    }
}
