//! Bytes text records.
//!
//! Laengenfeld mit 1, 2 oder 4 Byte (little-endian), danach die Rohdaten.

use crate::bytestream::{ByteReader, ByteWriter};
use crate::error::Quota;
use crate::record::TextRecord;
use crate::string::{length_width, read_length, write_length};
use crate::{Error, Result};

/// Kleinster Bytes-Record fuer `len` Bytes.
pub fn select(len: usize) -> TextRecord {
    match len {
        0..=0xFF => TextRecord::Bytes8,
        0x100..=0xFFFF => TextRecord::Bytes16,
        _ => TextRecord::Bytes32,
    }
}

pub fn encode(writer: &mut ByteWriter, record: TextRecord, value: &[u8]) -> Result<()> {
    write_length(writer, length_width(record), value.len())?;
    writer.write_bytes(value);
    Ok(())
}

/// Liest einen Bytes-Record. `max_len` begrenzt die Payload.
pub fn decode(reader: &mut ByteReader, record: TextRecord, max_len: usize) -> Result<Vec<u8>> {
    let len = read_length(reader, length_width(record))?;
    if len > max_len {
        return Err(Error::QuotaExceeded {
            quota: Quota::StringLength,
            limit: max_len,
            actual: len,
        });
    }
    Ok(reader.read_bytes(len)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: &[u8]) -> Vec<u8> {
        let record = select(value.len());
        let mut w = ByteWriter::new();
        encode(&mut w, record, value).unwrap();
        let data = w.into_vec();
        let mut r = ByteReader::new(&data);
        decode(&mut r, record, usize::MAX).unwrap()
    }

    #[test]
    fn empty_bytes() {
        let mut w = ByteWriter::new();
        encode(&mut w, select(0), &[]).unwrap();
        assert_eq!(w.into_vec(), [0x00]);
        assert_eq!(round_trip(&[]), Vec::<u8>::new());
    }

    #[test]
    fn multiple_octets() {
        let input = vec![0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(round_trip(&input), input);
    }

    #[test]
    fn width_selection() {
        assert_eq!(select(255), TextRecord::Bytes8);
        assert_eq!(select(256), TextRecord::Bytes16);
        assert_eq!(select(70_000), TextRecord::Bytes32);
        let big = vec![7u8; 70_000];
        assert_eq!(round_trip(&big), big);
    }

    #[test]
    fn truncated_payload() {
        let data = [0x04, 0x01];
        let mut r = ByteReader::new(&data);
        assert!(matches!(
            decode(&mut r, TextRecord::Bytes8, usize::MAX),
            Err(Error::PrematureEndOfStream { offset: 1 })
        ));
    }
}
