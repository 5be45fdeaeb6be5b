//! Guid and UniqueId text records (16 Bytes).
//!
//! Beide verwenden das gemischt-endige GUID-Layout: die ersten drei Felder
//! little-endian, die letzten acht Bytes in Reihenfolge.

use std::fmt;

use uuid::Uuid;

use crate::bytestream::{ByteReader, ByteWriter};
use crate::Result;

/// Eindeutige Kennung, die als `urn:uuid:` Text erscheint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniqueId(pub Uuid);

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "urn:uuid:{}", self.0.hyphenated())
    }
}

impl From<Uuid> for UniqueId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

pub fn encode(writer: &mut ByteWriter, value: &Uuid) {
    writer.write_bytes(&value.to_bytes_le());
}

pub fn decode(reader: &mut ByteReader) -> Result<Uuid> {
    Ok(Uuid::from_bytes_le(reader.read_array()?))
}
