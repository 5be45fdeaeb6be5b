//! Variable-length 31-bit unsigned integer ("MB31").
//!
//! Each octet has a continuation bit (MSB) and 7 data bits. The least
//! significant group is written first. At most five octets; the fifth may
//! only carry the top three bits of a value below 2^31.

use crate::bytestream::{ByteReader, ByteWriter};
use crate::{Error, Result};

/// Groesster kodierbarer Wert.
pub const MAX: u32 = i32::MAX as u32;

/// Encodes a `u32 <= MAX` as MB31.
///
/// Groessere Werte sind ein Aufruferfehler und werden abgelehnt, bevor
/// ein Byte geschrieben wird.
#[inline]
pub fn encode(writer: &mut ByteWriter, value: u32) -> Result<()> {
    if value > MAX {
        return Err(Error::out_of_range(format!("{value} exceeds 31-bit length/index range")));
    }
    if value < 128 {
        // Fast-Path: Single-Byte (haeufigster Fall, kleine Laengen)
        writer.write_u8(value as u8);
        return Ok(());
    }
    let mut v = value;
    loop {
        let low7 = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            writer.write_u8(low7);
            return Ok(());
        }
        writer.write_u8(0x80 | low7);
    }
}

/// Kodiert eine Laenge (usize) als MB31.
pub fn encode_len(writer: &mut ByteWriter, len: usize) -> Result<()> {
    let value = u32::try_from(len)
        .map_err(|_| Error::out_of_range(format!("length {len} exceeds 31-bit range")))?;
    encode(writer, value)
}

/// Decodes an MB31 value from the stream.
#[inline]
pub fn decode(reader: &mut ByteReader) -> Result<u32> {
    let start = reader.position();
    let byte = reader.read_u8()?;
    if byte & 0x80 == 0 {
        return Ok(u32::from(byte));
    }
    let mut result = u32::from(byte & 0x7F);
    let mut shift: u32 = 7;
    loop {
        let byte = reader.read_u8()?;
        let data = u32::from(byte & 0x7F);
        // 5. Byte: nur 3 Datenbits gueltig, kein Continuation-Bit
        if shift == 28 && (data > 0x07 || byte & 0x80 != 0) {
            return Err(Error::IntegerOverflow { offset: start });
        }
        result |= data << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Dekodiert eine Laenge als usize.
#[inline]
pub fn decode_len(reader: &mut ByteReader) -> Result<usize> {
    decode(reader).map(|v| v as usize)
}
