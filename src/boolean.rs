//! Boolean text records.
//!
//! Einzelwerte haben eigene Tags ohne Payload (True/False). Nur in
//! Array-Records erscheint ein Boolean als Payload-Byte (0 oder 1).

use crate::bytestream::{ByteReader, ByteWriter};
use crate::record::TextRecord;
use crate::{Error, Result};

/// Tag fuer einen einzelnen Boolean.
pub fn select(value: bool) -> TextRecord {
    if value { TextRecord::True } else { TextRecord::False }
}

/// Payload-Byte eines Bool-Array-Elements.
pub fn encode(writer: &mut ByteWriter, value: bool) {
    writer.write_u8(u8::from(value));
}

pub fn decode(reader: &mut ByteReader) -> Result<bool> {
    let offset = reader.position();
    match reader.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::invalid_payload(offset, format!("boolean byte {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_tags() {
        assert_eq!(select(true).tag(), 0x86);
        assert_eq!(select(false).tag(), 0x84);
    }

    #[test]
    fn payload_round_trip() {
        let mut w = ByteWriter::new();
        encode(&mut w, true);
        encode(&mut w, false);
        let data = w.into_vec();
        assert_eq!(data, [1, 0]);
        let mut r = ByteReader::new(&data);
        assert!(decode(&mut r).unwrap());
        assert!(!decode(&mut r).unwrap());
    }

    #[test]
    fn invalid_byte() {
        let data = [2];
        assert!(matches!(
            decode(&mut ByteReader::new(&data)),
            Err(Error::InvalidPayload { offset: 0, .. })
        ));
    }
}
