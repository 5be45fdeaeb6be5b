//! Decimal text record (16 Bytes).
//!
//! Layout:
//!
//! ```text
//! 0..2   reserviert (0)
//! 2      scale (0..=28)
//! 3      sign (0x00 positiv, 0x80 negativ)
//! 4..8   hi32 der Mantisse, little-endian
//! 8..16  lo64 der Mantisse, little-endian
//! ```
//!
//! Der Wert ist `(-1)^sign * mantissa / 10^scale` mit einer 96-Bit Mantisse.

use std::fmt;

use crate::bytestream::{ByteReader, ByteWriter};
use crate::{Error, Result};

/// Groesste Mantisse (96 Bit).
pub const MAX_MANTISSA: u128 = (1u128 << 96) - 1;

/// Groesste Scale.
pub const MAX_SCALE: u8 = 28;

const SIGN_NEGATIVE: u8 = 0x80;

/// Festkomma-Dezimalzahl mit 96-Bit Mantisse.
///
/// Die Darstellung ist nicht normalisiert: `1.0` (mantissa 10, scale 1) und
/// `1` (mantissa 1, scale 0) sind verschiedene Werte und bleiben es auch im
/// Round-Trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: u128,
    scale: u8,
    negative: bool,
}

impl Decimal {
    /// Erstellt einen Decimal; Mantisse und Scale werden geprueft.
    pub fn new(mantissa: u128, scale: u8, negative: bool) -> Result<Self> {
        if mantissa > MAX_MANTISSA {
            return Err(Error::out_of_range(format!("decimal mantissa {mantissa} exceeds 96 bits")));
        }
        if scale > MAX_SCALE {
            return Err(Error::out_of_range(format!("decimal scale {scale} exceeds {MAX_SCALE}")));
        }
        Ok(Self { mantissa, scale, negative })
    }

    pub fn mantissa(&self) -> u128 {
        self.mantissa
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self {
            mantissa: u128::from(value.unsigned_abs()),
            scale: 0,
            negative: value < 0,
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.to_string();
        let scale = self.scale as usize;
        if self.negative && self.mantissa != 0 {
            f.write_str("-")?;
        }
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{int}.{frac}")
        } else {
            write!(f, "0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }
}

/// Schreibt die 16-Byte Payload.
pub fn encode(writer: &mut ByteWriter, value: Decimal) {
    writer.write_u16_le(0);
    writer.write_u8(value.scale);
    writer.write_u8(if value.negative { SIGN_NEGATIVE } else { 0 });
    writer.write_u32_le((value.mantissa >> 64) as u32);
    writer.write_u64_le(value.mantissa as u64);
}

/// Liest die 16-Byte Payload und prueft reservierte Bytes, Scale und Sign.
pub fn decode(reader: &mut ByteReader) -> Result<Decimal> {
    let offset = reader.position();
    let bytes: [u8; 16] = reader.read_array()?;
    if bytes[0] != 0 || bytes[1] != 0 {
        return Err(Error::invalid_payload(offset, "decimal reserved bytes are not zero"));
    }
    let scale = bytes[2];
    if scale > MAX_SCALE {
        return Err(Error::invalid_payload(offset, format!("decimal scale {scale} exceeds {MAX_SCALE}")));
    }
    let negative = match bytes[3] {
        0 => false,
        SIGN_NEGATIVE => true,
        other => return Err(Error::invalid_payload(offset, format!("decimal sign byte 0x{other:02X}"))),
    };
    let hi = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let mut lo = [0u8; 8];
    lo.copy_from_slice(&bytes[8..16]);
    let mantissa = (u128::from(hi) << 64) | u128::from(u64::from_le_bytes(lo));
    Ok(Decimal { mantissa, scale, negative })
}
