//! DateTime and TimeSpan text records.
//!
//! Beide Werte zaehlen Ticks zu 100 ns. Ein DateTime zaehlt ab
//! 0001-01-01T00:00:00 und traegt in den oberen zwei Bits seine Art
//! (unspezifiziert, UTC, lokal); ein TimeSpan ist eine vorzeichenbehaftete
//! Dauer.

use std::fmt;

use crate::bytestream::{ByteReader, ByteWriter};
use crate::{Error, Result};

/// Ticks pro Sekunde.
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Ticks pro Tag.
pub const TICKS_PER_DAY: u64 = TICKS_PER_SECOND * 86_400;

/// Letzter Tick von 9999-12-31.
pub const MAX_TICKS: u64 = 3_155_378_975_999_999_999;

const TICKS_MASK: u64 = (1 << 62) - 1;

/// Tage zwischen 0001-01-01 und 1970-01-01.
const DAYS_TO_UNIX_EPOCH: i64 = 719_162;

/// Zeitzonen-Art eines [`DateTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeKind {
    Unspecified = 0,
    Utc = 1,
    Local = 2,
}

/// Zeitpunkt in Ticks seit 0001-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    ticks: u64,
    kind: DateTimeKind,
}

impl DateTime {
    pub fn new(ticks: u64, kind: DateTimeKind) -> Result<Self> {
        if ticks > MAX_TICKS {
            return Err(Error::out_of_range(format!("datetime ticks {ticks} exceed {MAX_TICKS}")));
        }
        Ok(Self { ticks, kind })
    }

    /// Zeitpunkt aus Kalenderdatum und Uhrzeit.
    pub fn from_civil(
        year: i64,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        kind: DateTimeKind,
    ) -> Result<Self> {
        if !(1..=9999).contains(&year)
            || !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return Err(Error::out_of_range(format!(
                "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02} is not a valid datetime"
            )));
        }
        let days = days_from_civil(year, month, day) + DAYS_TO_UNIX_EPOCH;
        let seconds = days as u64 * 86_400 + u64::from(hour * 3600 + minute * 60 + second);
        Self::new(seconds * TICKS_PER_SECOND, kind)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn kind(&self) -> DateTimeKind {
        self.kind
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = (self.ticks / TICKS_PER_DAY) as i64;
        let (year, month, day) = civil_from_days(days - DAYS_TO_UNIX_EPOCH);
        let rem = self.ticks % TICKS_PER_DAY;
        let secs = rem / TICKS_PER_SECOND;
        let frac = rem % TICKS_PER_SECOND;
        write!(
            f,
            "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        )?;
        write_fraction(f, frac)?;
        if self.kind == DateTimeKind::Utc {
            f.write_str("Z")?;
        }
        Ok(())
    }
}

/// Dauer in Ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeSpan(pub i64);

impl TimeSpan {
    pub fn from_seconds(seconds: i64) -> Self {
        Self(seconds.saturating_mul(TICKS_PER_SECOND as i64))
    }

    pub fn ticks(&self) -> i64 {
        self.0
    }
}

/// `xs:duration` Darstellung, z.B. `-P1DT2H3M4.5S`.
impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            f.write_str("-")?;
        }
        let ticks = self.0.unsigned_abs();
        let days = ticks / TICKS_PER_DAY;
        let rem = ticks % TICKS_PER_DAY;
        let secs = rem / TICKS_PER_SECOND;
        let frac = rem % TICKS_PER_SECOND;
        let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
        f.write_str("P")?;
        if days > 0 {
            write!(f, "{days}D")?;
        }
        if rem == 0 {
            if days == 0 {
                f.write_str("T0S")?;
            }
            return Ok(());
        }
        f.write_str("T")?;
        if h > 0 {
            write!(f, "{h}H")?;
        }
        if m > 0 {
            write!(f, "{m}M")?;
        }
        if s > 0 || frac > 0 {
            write!(f, "{s}")?;
            write_fraction(f, frac)?;
            f.write_str("S")?;
        }
        Ok(())
    }
}

fn write_fraction(f: &mut fmt::Formatter<'_>, frac: u64) -> fmt::Result {
    if frac == 0 {
        return Ok(());
    }
    let digits = format!("{frac:07}");
    write!(f, ".{}", digits.trim_end_matches('0'))
}

/// Tage seit 1970-01-01 → (Jahr, Monat, Tag), proleptisch gregorianisch.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe as i64 + era * 400;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

/// Gregorianisch: durch 4 teilbar, Jahrhunderte nur durch 400.
fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// (Jahr, Monat, Tag) → Tage seit 1970-01-01.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = (y - era * 400) as u64;
    let m = u64::from(month);
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + u64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe as i64 - 719_468
}

/// Schreibt die 8-Byte Payload: `ticks | kind << 62`.
pub fn encode(writer: &mut ByteWriter, value: DateTime) {
    writer.write_u64_le(value.ticks | ((value.kind as u64) << 62));
}

/// Liest die 8-Byte Payload und prueft Art und Tick-Bereich.
pub fn decode(reader: &mut ByteReader) -> Result<DateTime> {
    let offset = reader.position();
    let raw = reader.read_u64_le()?;
    let kind = match raw >> 62 {
        0 => DateTimeKind::Unspecified,
        1 => DateTimeKind::Utc,
        2 => DateTimeKind::Local,
        other => return Err(Error::invalid_payload(offset, format!("datetime kind {other}"))),
    };
    let ticks = raw & TICKS_MASK;
    if ticks > MAX_TICKS {
        return Err(Error::invalid_payload(offset, format!("datetime ticks {ticks} exceed {MAX_TICKS}")));
    }
    Ok(DateTime { ticks, kind })
}

pub fn encode_timespan(writer: &mut ByteWriter, value: TimeSpan) {
    writer.write_bytes(&value.0.to_le_bytes());
}

pub fn decode_timespan(reader: &mut ByteReader) -> Result<TimeSpan> {
    Ok(TimeSpan(i64::from_le_bytes(reader.read_array()?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_in_top_bits() {
        let dt = DateTime::new(1, DateTimeKind::Utc).unwrap();
        let mut w = ByteWriter::new();
        encode(&mut w, dt);
        assert_eq!(w.into_vec(), [1, 0, 0, 0, 0, 0, 0, 0x40]);
    }

    #[test]
    fn round_trip_kinds() {
        for kind in [DateTimeKind::Unspecified, DateTimeKind::Utc, DateTimeKind::Local] {
            let dt = DateTime::new(MAX_TICKS, kind).unwrap();
            let mut w = ByteWriter::new();
            encode(&mut w, dt);
            let data = w.into_vec();
            assert_eq!(decode(&mut ByteReader::new(&data)).unwrap(), dt);
        }
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert!(DateTime::new(MAX_TICKS + 1, DateTimeKind::Utc).is_err());
    }

    #[test]
    fn decode_rejects_kind_3() {
        let data = [0, 0, 0, 0, 0, 0, 0, 0xC0];
        assert!(matches!(
            decode(&mut ByteReader::new(&data)),
            Err(Error::InvalidPayload { offset: 0, .. })
        ));
    }

    #[test]
    fn decode_rejects_ticks_above_max() {
        let data = (MAX_TICKS + 1).to_le_bytes();
        assert!(decode(&mut ByteReader::new(&data)).is_err());
    }

    #[test]
    fn civil_conversion() {
        let dt = DateTime::from_civil(2000, 1, 1, 0, 0, 0, DateTimeKind::Unspecified).unwrap();
        assert_eq!(dt.ticks(), 630_822_816_000_000_000);
        assert_eq!(dt.to_string(), "2000-01-01T00:00:00");
        let epoch = DateTime::new(0, DateTimeKind::Utc).unwrap();
        assert_eq!(epoch.to_string(), "0001-01-01T00:00:00Z");
        let leap = DateTime::from_civil(2024, 2, 29, 13, 5, 9, DateTimeKind::Utc).unwrap();
        assert_eq!(leap.to_string(), "2024-02-29T13:05:09Z");
    }

    #[test]
    fn civil_rejects_days_beyond_month() {
        let utc = DateTimeKind::Utc;
        assert!(DateTime::from_civil(2024, 2, 29, 0, 0, 0, utc).is_ok());
        assert!(DateTime::from_civil(2000, 2, 29, 0, 0, 0, utc).is_ok());
        assert!(DateTime::from_civil(2023, 2, 29, 0, 0, 0, utc).is_err());
        assert!(DateTime::from_civil(1900, 2, 29, 0, 0, 0, utc).is_err());
        let err = DateTime::from_civil(2023, 2, 31, 0, 0, 0, utc).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ConstraintViolation);
        assert!(DateTime::from_civil(2023, 4, 31, 0, 0, 0, utc).is_err());
        assert!(DateTime::from_civil(2023, 4, 30, 0, 0, 0, utc).is_ok());
        assert!(DateTime::from_civil(2023, 12, 31, 23, 59, 59, utc).is_ok());
        assert!(DateTime::from_civil(2023, 6, 0, 0, 0, 0, utc).is_err());
    }

    #[test]
    fn display_fraction() {
        let dt = DateTime::new(5_000_000, DateTimeKind::Unspecified).unwrap();
        assert_eq!(dt.to_string(), "0001-01-01T00:00:00.5");
        let max = DateTime::new(MAX_TICKS, DateTimeKind::Unspecified).unwrap();
        assert_eq!(max.to_string(), "9999-12-31T23:59:59.9999999");
    }

    #[test]
    fn timespan_payload() {
        let mut w = ByteWriter::new();
        encode_timespan(&mut w, TimeSpan(-1));
        let data = w.into_vec();
        assert_eq!(data, [0xFF; 8]);
        assert_eq!(decode_timespan(&mut ByteReader::new(&data)).unwrap(), TimeSpan(-1));
    }

    #[test]
    fn timespan_display() {
        assert_eq!(TimeSpan(0).to_string(), "PT0S");
        assert_eq!(TimeSpan::from_seconds(90).to_string(), "PT1M30S");
        assert_eq!(TimeSpan::from_seconds(86_400).to_string(), "P1D");
        assert_eq!(TimeSpan(-(TICKS_PER_DAY as i64) - 5_000_000).to_string(), "-P1DT0.5S");
        assert_eq!(TimeSpan(i64::MIN).to_string().chars().next(), Some('-'));
    }
}
