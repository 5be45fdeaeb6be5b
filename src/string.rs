//! Character text records and length-prefixed strings.
//!
//! Text-Content verwendet Records mit fester Laengenbreite (1, 2 oder 4 Byte,
//! little-endian) und UTF-8 oder UTF-16LE Payload. Namen, Kommentare und
//! Preamble-Eintraege verwenden stattdessen ein MB31-Laengenpraefix.

use std::sync::Arc;

use crate::bytestream::{ByteReader, ByteWriter};
use crate::error::Quota;
use crate::record::TextRecord;
use crate::{Error, Result, unsigned_integer};

/// Breite des Laengenfelds (Bytes) fuer Chars-, Bytes- und UnicodeChars-Records.
pub(crate) fn length_width(record: TextRecord) -> usize {
    match record {
        TextRecord::Chars8 | TextRecord::Bytes8 | TextRecord::UnicodeChars8 => 1,
        TextRecord::Chars16 | TextRecord::Bytes16 | TextRecord::UnicodeChars16 => 2,
        _ => 4,
    }
}

/// Schreibt eine Laenge in `width` Bytes.
pub(crate) fn write_length(writer: &mut ByteWriter, width: usize, len: usize) -> Result<()> {
    let fits = match width {
        1 => len <= 0xFF,
        2 => len <= 0xFFFF,
        _ => len <= i32::MAX as usize,
    };
    if !fits {
        return Err(Error::out_of_range(format!("length {len} does not fit a {width}-byte field")));
    }
    match width {
        1 => writer.write_u8(len as u8),
        2 => writer.write_u16_le(len as u16),
        _ => writer.write_u32_le(len as u32),
    }
    Ok(())
}

/// Liest eine Laenge aus `width` Bytes. 32-Bit Laengen sind vorzeichenbehaftet.
pub(crate) fn read_length(reader: &mut ByteReader, width: usize) -> Result<usize> {
    let offset = reader.position();
    Ok(match width {
        1 => usize::from(reader.read_u8()?),
        2 => usize::from(reader.read_u16_le()?),
        _ => {
            let len = reader.read_u32_le()?;
            if len > i32::MAX as u32 {
                return Err(Error::invalid_payload(offset, format!("negative length {}", len as i32)));
            }
            len as usize
        }
    })
}

/// Kleinster Record einer Familie fuer eine Payload von `len` Bytes.
fn by_length(len: usize, records: [TextRecord; 3]) -> TextRecord {
    match len {
        0..=0xFF => records[0],
        0x100..=0xFFFF => records[1],
        _ => records[2],
    }
}

/// Waehlt den kuerzesten Record fuer `value`.
///
/// UTF-16 wird nur gewaehlt, wenn der gesamte Record (Laengenfeld + Payload)
/// strikt kuerzer ist als die UTF-8 Form.
pub fn select(value: &str, prefer_utf16: bool) -> TextRecord {
    if value.is_empty() {
        return TextRecord::Empty;
    }
    let utf8_len = value.len();
    let utf8 = by_length(utf8_len, [TextRecord::Chars8, TextRecord::Chars16, TextRecord::Chars32]);
    // Reines ASCII ist in UTF-16 immer doppelt so lang
    if !prefer_utf16 || value.is_ascii() {
        return utf8;
    }
    let utf16_len = value.encode_utf16().count() * 2;
    let utf16 = by_length(
        utf16_len,
        [TextRecord::UnicodeChars8, TextRecord::UnicodeChars16, TextRecord::UnicodeChars32],
    );
    if length_width(utf16) + utf16_len < length_width(utf8) + utf8_len {
        utf16
    } else {
        utf8
    }
}

/// Schreibt Laenge und Payload von `value` im Format von `record`.
pub fn encode(writer: &mut ByteWriter, record: TextRecord, value: &str) -> Result<()> {
    match record {
        TextRecord::Empty => Ok(()),
        TextRecord::Chars8 | TextRecord::Chars16 | TextRecord::Chars32 => {
            write_length(writer, length_width(record), value.len())?;
            writer.write_bytes(value.as_bytes());
            Ok(())
        }
        TextRecord::UnicodeChars8 | TextRecord::UnicodeChars16 | TextRecord::UnicodeChars32 => {
            let units: Vec<u16> = value.encode_utf16().collect();
            write_length(writer, length_width(record), units.len() * 2)?;
            for unit in units {
                writer.write_u16_le(unit);
            }
            Ok(())
        }
        other => Err(Error::out_of_range(format!("{} is not a character record", other.name()))),
    }
}

/// Liest einen Chars- oder UnicodeChars-Record. `max_len` begrenzt die Payload in Bytes.
pub fn decode(reader: &mut ByteReader, record: TextRecord, max_len: usize) -> Result<Arc<str>> {
    if record == TextRecord::Empty {
        return Ok("".into());
    }
    let len = read_length(reader, length_width(record))?;
    check_length(len, max_len)?;
    let offset = reader.position();
    let bytes = reader.read_bytes(len)?;
    match record {
        TextRecord::Chars8 | TextRecord::Chars16 | TextRecord::Chars32 => utf8(bytes, offset),
        TextRecord::UnicodeChars8 | TextRecord::UnicodeChars16 | TextRecord::UnicodeChars32 => {
            utf16(bytes, offset)
        }
        other => Err(Error::invalid_payload(offset, format!("{} is not a character record", other.name()))),
    }
}

/// Schreibt einen String mit MB31-Laengenpraefix.
pub fn encode_prefixed(writer: &mut ByteWriter, value: &str) -> Result<()> {
    unsigned_integer::encode_len(writer, value.len())?;
    writer.write_bytes(value.as_bytes());
    Ok(())
}

/// Liest einen String mit MB31-Laengenpraefix.
pub fn decode_prefixed(reader: &mut ByteReader, max_len: usize) -> Result<Arc<str>> {
    let len = unsigned_integer::decode_len(reader)?;
    check_length(len, max_len)?;
    let offset = reader.position();
    let bytes = reader.read_bytes(len)?;
    utf8(bytes, offset)
}

fn check_length(len: usize, max_len: usize) -> Result<()> {
    if len > max_len {
        return Err(Error::QuotaExceeded {
            quota: Quota::StringLength,
            limit: max_len,
            actual: len,
        });
    }
    Ok(())
}

fn utf8(bytes: &[u8], offset: usize) -> Result<Arc<str>> {
    std::str::from_utf8(bytes)
        .map(Arc::from)
        .map_err(|e| Error::InvalidText { offset: offset + e.valid_up_to() })
}

fn utf16(bytes: &[u8], offset: usize) -> Result<Arc<str>> {
    if bytes.len() % 2 != 0 {
        return Err(Error::InvalidText { offset });
    }
    let units = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
    char::decode_utf16(units)
        .collect::<core::result::Result<String, _>>()
        .map(Arc::from)
        .map_err(|_| Error::InvalidText { offset })
}
